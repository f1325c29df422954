use bon::Builder;

use super::InstallError;

/// Values substituted into a [`UrlTemplate`].
#[derive(Debug, Clone, Builder)]
pub struct TemplateVars<'scope> {
    pub version: &'scope str,
    pub os: &'scope str,
    pub arch: &'scope str,
    pub ext: &'scope str,
}

impl TemplateVars<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        Some(match key {
            "version" => self.version,
            "os" => self.os,
            "arch" => self.arch,
            "ext" => self.ext,
            _ => return None,
        })
    }
}

/// A download URL with `{version}`, `{os}`, `{arch}`
/// and `{ext}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlTemplate<'scope>(&'scope str);

impl<'scope> UrlTemplate<'scope> {
    #[must_use]
    pub const fn new(template: &'scope str) -> Self {
        Self(template)
    }

    /// Substitutes every placeholder.
    ///
    /// # Errors
    /// Will error on an unknown or unterminated placeholder.
    pub fn render(&self, vars: &TemplateVars) -> Result<String, InstallError> {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            let end = after.find('}').ok_or_else(|| {
                InstallError::Template(self.0.to_string(), "unterminated placeholder".into())
            })?;
            let key = &after[..end];

            let value = vars.get(key).ok_or_else(|| {
                InstallError::Template(self.0.to_string(), format!("unknown placeholder `{key}`"))
            })?;
            out.push_str(value);
            rest = &after[end + 1..];
        }
        out.push_str(rest);

        Ok(out)
    }
}
