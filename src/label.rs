use std::fmt;
use std::str::FromStr;

/// The value of the first CSV column: which series a row belongs to, for
/// example one scenario or one replication of a model.
#[derive(Debug, PartialEq, Clone, PartialOrd, Ord, Eq)]
pub struct Label(pub String);
impl From<String> for Label {
    fn from(x: String) -> Label {
        Label(x)
    }
}
impl From<&str> for Label {
    fn from(x: &str) -> Label {
        Label(x.to_string())
    }
}
impl FromStr for Label {
    type Err = ();
    fn from_str(x: &str) -> Result<Label, ()> {
        Ok(Label::from(x))
    }
}
impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl Label {
    /// The name given to the estimator tracking `column` for this label.
    pub fn estimator_name(&self, column: &str) -> String {
        format!("{}:{}", self.0, column)
    }
}
