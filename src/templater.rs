//! Template substitution for include declarations.
//!
//! The resolver renders `{{.NAME}}` expressions in an include's taskfile
//! reference, base directory, and local variable bindings against the
//! includer's merged environment before constructing a child location. The
//! templater accumulates the first error it hits and keeps returning inputs
//! unchanged after that, so a caller can render several fields and check once
//! at the end.

use crate::error::{Error, Result};
use crate::types::Vars;

/// Renders template expressions against a fixed variable set, remembering
/// the first error encountered.
pub struct Templater<'a> {
    vars: &'a Vars,
    err: Option<Error>,
}

impl<'a> Templater<'a> {
    pub fn new(vars: &'a Vars) -> Self {
        Self { vars, err: None }
    }

    /// Render every `{{.NAME}}` expression in `input`. Unknown variables
    /// render as the empty string. After the first error, inputs are
    /// returned unchanged.
    pub fn replace(&mut self, input: &str) -> String {
        if self.err.is_some() {
            return input.to_string();
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                self.err = Some(Error::Template {
                    expression: rest[start..].to_string(),
                    reason: "unclosed template expression".to_string(),
                });
                return input.to_string();
            };
            let expression = after[..end].trim();
            let Some(name) = expression.strip_prefix('.') else {
                self.err = Some(Error::Template {
                    expression: expression.to_string(),
                    reason: "only variable lookups of the form {{.NAME}} are supported"
                        .to_string(),
                });
                return input.to_string();
            };
            if let Some(value) = self.vars.get(name) {
                out.push_str(value);
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        out
    }

    /// Render every value in a variable set.
    pub fn replace_vars(&mut self, vars: &Vars) -> Vars {
        let mut rendered = Vars::default();
        for (name, value) in &vars.0 {
            rendered.insert(name.clone(), self.replace(value));
        }
        rendered
    }

    /// Consume the templater, surfacing the first error encountered.
    pub fn finish(self) -> Result<()> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vars {
        let mut vars = Vars::default();
        for (name, value) in pairs {
            vars.insert(*name, *value);
        }
        vars
    }

    #[test]
    fn replaces_known_variables() {
        let vars = vars(&[("DIR", "lib"), ("EXT", "yml")]);
        let mut tpl = Templater::new(&vars);
        assert_eq!(
            tpl.replace("./{{.DIR}}/Taskfile.{{.EXT}}"),
            "./lib/Taskfile.yml"
        );
        assert!(tpl.finish().is_ok());
    }

    #[test]
    fn unknown_variable_renders_empty() {
        let vars = Vars::default();
        let mut tpl = Templater::new(&vars);
        assert_eq!(tpl.replace("a{{.MISSING}}b"), "ab");
        assert!(tpl.finish().is_ok());
    }

    #[test]
    fn unclosed_expression_is_an_error() {
        let vars = Vars::default();
        let mut tpl = Templater::new(&vars);
        assert_eq!(tpl.replace("./{{.DIR"), "./{{.DIR");
        assert!(matches!(tpl.finish(), Err(Error::Template { .. })));
    }

    #[test]
    fn first_error_wins_and_later_inputs_pass_through() {
        let vars = vars(&[("DIR", "lib")]);
        let mut tpl = Templater::new(&vars);
        tpl.replace("{{bad");
        // After the error, rendering is suspended.
        assert_eq!(tpl.replace("{{.DIR}}"), "{{.DIR}}");
        assert!(tpl.finish().is_err());
    }

    #[test]
    fn renders_variable_sets() {
        let env = vars(&[("MODE", "release")]);
        let mut tpl = Templater::new(&env);
        let rendered = tpl.replace_vars(&vars(&[("FLAGS", "--{{.MODE}}")]));
        assert_eq!(rendered.get("FLAGS"), Some("--release"));
        assert!(tpl.finish().is_ok());
    }
}
