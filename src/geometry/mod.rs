mod profile;
mod rect;

pub use profile::{derive_profile_window, ProfileWindow, ProfileWindows};
pub use rect::{validate_rect, Axis, CandidateRect, GeometryWarning, Rect, Size, Validated};
pub(crate) use rect::parse_pair;
