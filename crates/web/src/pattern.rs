//! Path templates such as `/user/:id`.
//!
//! A template is a sequence of `/` separated segments. A segment starting
//! with `:` is a named parameter that captures exactly one non-empty path
//! segment; every other segment must match byte for byte. There are no
//! wildcards and no optional segments, so a path matches only when it has
//! the same number of segments as the template.

use crate::PathParams;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("path template '{template}' must start with '/'")]
    MissingLeadingSlash { template: String },

    #[error("path template '{template}' has a parameter without a name")]
    EmptyParamName { template: String },

    #[error("parameter '{name}' appears more than once in path template '{template}'")]
    DuplicateParam { name: String, template: String },
}

impl PathPattern {
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let Some(rest) = template.strip_prefix('/') else {
            return Err(PatternError::MissingLeadingSlash { template: template.to_owned() });
        };

        let mut segments = Vec::new();
        for segment in rest.split('/') {
            match segment.strip_prefix(':') {
                Some("") => return Err(PatternError::EmptyParamName { template: template.to_owned() }),
                Some(name) => {
                    if segments.iter().any(|s| matches!(s, Segment::Param(existing) if existing == name)) {
                        return Err(PatternError::DuplicateParam { name: name.to_owned(), template: template.to_owned() });
                    }
                    segments.push(Segment::Param(name.to_owned()));
                }
                None => segments.push(Segment::Literal(segment.to_owned())),
            }
        }

        Ok(Self { template: template.to_owned(), segments })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names of the parameter segments, left to right.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Tests `path` against this pattern, returning the bound parameters on a match.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut parts = path.strip_prefix('/')?.split('/');
        let mut params = PathParams::new();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => params.insert(name.clone(), part.to_owned()),
            }
        }

        if parts.next().is_some() {
            return None;
        }

        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_segment() {
        let pattern = PathPattern::compile("/user/:id").unwrap();

        let params = pattern.matches("/user/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);

        assert!(pattern.matches("/user").is_none());
        assert!(pattern.matches("/user/42/extra").is_none());
        assert!(pattern.matches("/user/").is_none());
        assert!(pattern.matches("/users/42").is_none());
    }

    #[test]
    fn params_bind_left_to_right() {
        let pattern = PathPattern::compile("/org/:org/repo/:repo").unwrap();
        let params = pattern.matches("/org/foldright/repo/nano").unwrap();

        let pairs = params.iter().collect::<Vec<_>>();
        assert_eq!(pairs, vec![("org", "foldright"), ("repo", "nano")]);
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["org", "repo"]);
    }

    #[test]
    fn root() {
        let pattern = PathPattern::compile("/").unwrap();

        assert!(pattern.matches("/").unwrap().is_empty());
        assert!(pattern.matches("/a").is_none());
        assert!(pattern.matches("").is_none());
    }

    #[test]
    fn literals_are_case_sensitive() {
        let pattern = PathPattern::compile("/Admin").unwrap();

        assert!(pattern.matches("/Admin").is_some());
        assert!(pattern.matches("/admin").is_none());
    }

    #[test]
    fn compile_errors() {
        assert_eq!(
            PathPattern::compile("user/:id"),
            Err(PatternError::MissingLeadingSlash { template: "user/:id".into() })
        );
        assert_eq!(PathPattern::compile("/user/:"), Err(PatternError::EmptyParamName { template: "/user/:".into() }));
        assert!(matches!(
            PathPattern::compile("/a/:id/b/:id"),
            Err(PatternError::DuplicateParam { name, .. }) if name == "id"
        ));
    }
}
