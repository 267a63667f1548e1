#[cfg(feature = "unicode")]
pub const ARROW: &str = "→";
#[cfg(not(feature = "unicode"))]
pub const ARROW: &str = "->";

#[cfg(feature = "unicode")]
pub const NEWLINE: &str = "↳";
#[cfg(not(feature = "unicode"))]
pub const NEWLINE: &str = ">";
