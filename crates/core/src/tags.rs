//! Well-known tag names on reference elements.

pub const NAME: &str = "name";
pub const BUILDING: &str = "building";
pub const HEIGHT: &str = "height";
pub const BUILDING_LEVELS: &str = "building:levels";
pub const BUILDING_PART: &str = "building:part";
