mod support;

use std::fs;

use appdeploy::render;
use support::target;

#[test]
fn make_conf_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let t = target(dir.path());

    let first = render::make_conf(&t).unwrap();
    let nginx = fs::read(&first.nginx_conf).unwrap();
    let supervisor = fs::read(&first.supervisor_conf).unwrap();

    let second = render::make_conf(&t).unwrap();

    assert_eq!(first.nginx_conf, second.nginx_conf);
    assert_eq!(fs::read(&second.nginx_conf).unwrap(), nginx);
    assert_eq!(fs::read(&second.supervisor_conf).unwrap(), supervisor);
}

#[test]
fn generated_files_point_into_the_remote_app_dir() {
    let dir = tempfile::tempdir().unwrap();
    let t = target(dir.path());

    render::make_conf(&t).unwrap();

    let nginx = fs::read_to_string(dir.path().join("etc/nginx.conf")).unwrap();
    let supervisor = fs::read_to_string(dir.path().join("etc/supervisor.conf")).unwrap();

    assert!(nginx.contains("/home/deploy/blog/static/"));
    assert!(supervisor.contains("/home/deploy/blog/venv/bin/gunicorn"));
    assert!(supervisor.contains("user = deploy"));
}

#[test]
fn existing_etc_dir_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("etc")).unwrap();
    fs::write(dir.path().join("etc/keep.txt"), "x").unwrap();

    render::make_conf(&target(dir.path())).unwrap();

    assert!(dir.path().join("etc/keep.txt").is_file());
    assert!(dir.path().join("etc/nginx.conf").is_file());
}
