use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Placeholders that can appear in a trajectory path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Iteration,
    Segment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field { field: Field, width: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder '{0}' (allowed: n_iter, seg_id)")]
    UnknownField(String),
    #[error("invalid format spec '{0}' (expected e.g. '06d')")]
    BadFormatSpec(String),
    #[error("unbalanced brace at position {0}")]
    UnbalancedBrace(usize),
}

/// A path pattern like `traj_segs/{n_iter:06d}/{seg_id:06d}/seg.xml` that is
/// parsed once and rendered for every (iteration, segment) pair. The optional root
/// directory is taken literally, braces in it are not placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    root: PathBuf,
    source: String,
    pieces: Vec<Piece>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut pieces: Vec<Piece> = Vec::new();
        let mut literal: String = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::UnbalancedBrace(pos)),
                '{' => {
                    let mut inner: String = String::new();
                    let mut closed: bool = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(parse_field(&inner)?);
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(PathTemplate {
            root: PathBuf::new(),
            source: template.to_owned(),
            pieces,
        })
    }

    /// Places the rendered paths below `root`. Absolute templates stay absolute.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = root.to_path_buf();
        self
    }

    pub fn render(&self, n_iter: u64, seg_id: usize) -> PathBuf {
        let mut path: String = String::with_capacity(self.source.len() + 8);
        for piece in self.pieces.iter() {
            match piece {
                Piece::Literal(text) => path.push_str(text),
                Piece::Field { field, width } => {
                    let value: u64 = match field {
                        Field::Iteration => n_iter,
                        Field::Segment => seg_id as u64,
                    };
                    path.push_str(&format!("{:0width$}", value, width = *width));
                }
            }
        }
        self.root.join(path)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.root.join(&self.source).display())
    }
}

fn parse_field(inner: &str) -> Result<Piece, TemplateError> {
    let (name, spec) = match inner.find(':') {
        Some(idx) => (&inner[..idx], Some(&inner[idx + 1..])),
        None => (inner, None),
    };
    let field: Field = match name.trim() {
        "n_iter" => Field::Iteration,
        "seg_id" => Field::Segment,
        other => return Err(TemplateError::UnknownField(other.to_owned())),
    };
    // only zero padded integers are supported: '06d', '6d' or 'd'
    let width: usize = match spec {
        None => 0,
        Some(spec) => {
            let digits: &str = spec
                .strip_suffix('d')
                .ok_or_else(|| TemplateError::BadFormatSpec(spec.to_owned()))?;
            if digits.is_empty() {
                0
            } else {
                digits
                    .parse::<usize>()
                    .map_err(|_| TemplateError::BadFormatSpec(spec.to_owned()))?
            }
        }
    };
    Ok(Piece::Field { field, width })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_zero_padded_fields() {
        let template = PathTemplate::parse("traj_segs/{n_iter:06d}/{seg_id:06d}/seg.xml").unwrap();
        assert_eq!(
            template.render(12, 3),
            PathBuf::from("traj_segs/000012/000003/seg.xml")
        );
    }

    #[test]
    fn renders_plain_fields_and_escapes() {
        let template = PathTemplate::parse("{{run}}/{n_iter}_{seg_id}.pdb").unwrap();
        assert_eq!(template.render(7, 41), PathBuf::from("{run}/7_41.pdb"));
    }

    #[test]
    fn width_smaller_than_value_is_not_truncated() {
        let template = PathTemplate::parse("{n_iter:02d}").unwrap();
        assert_eq!(template.render(12345, 0), PathBuf::from("12345"));
    }

    #[test]
    fn root_is_not_parsed() {
        let template = PathTemplate::parse("{n_iter:03d}/seg.xml")
            .unwrap()
            .with_root(Path::new("/data/run_{a}/{{x}}"));
        assert_eq!(template.render(4, 0), PathBuf::from("/data/run_{a}/{{x}}/004/seg.xml"));
        assert_eq!(template.to_string(), "/data/run_{a}/{{x}}/{n_iter:03d}/seg.xml");
    }

    #[test]
    fn rejects_unknown_placeholder() {
        assert_eq!(
            PathTemplate::parse("traj/{iteration}/seg.xml"),
            Err(TemplateError::UnknownField(String::from("iteration")))
        );
    }

    #[test]
    fn rejects_bad_spec() {
        assert_eq!(
            PathTemplate::parse("{seg_id:06x}"),
            Err(TemplateError::BadFormatSpec(String::from("06x")))
        );
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert_eq!(
            PathTemplate::parse("traj/{n_iter"),
            Err(TemplateError::UnbalancedBrace(5))
        );
        assert_eq!(
            PathTemplate::parse("traj/n_iter}"),
            Err(TemplateError::UnbalancedBrace(11))
        );
    }
}
