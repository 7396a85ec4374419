//! String template rendering utilities.

pub struct TemplateVars;

impl TemplateVars {
    pub const APP_USER: &'static str = "appUser";
    pub const APP_NAME: &'static str = "appName";
    pub const APP_DIR: &'static str = "appDir";
    pub const APP_PORT: &'static str = "appPort";
    pub const WSGI_APP: &'static str = "wsgiApp";
}

/// Replace every `{{key}}` with its value. Unknown placeholders are left as-is.
pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_every_occurrence() {
        let out = render("{{a}}/{{b}}/{{a}}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x/y/x");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        assert_eq!(render("{{missing}}", &[("a", "x")]), "{{missing}}");
    }
}
