//! Shared tuning values for the narrative runtime.

/// Maximum number of dialogue entries retained in the session log.
pub const LOG_CAPACITY: usize = 14;
/// Number of characters of the joined log sent to the story service.
pub const LOG_SUMMARY_MAX_CHARS: usize = 1_200;
/// Maximum length, in characters, of a derived ending identifier.
pub const ENDING_ID_MAX_CHARS: usize = 80;

pub const METER_MIN: i32 = 0;
pub const METER_MAX: i32 = 10;

pub const DEFAULT_CANONITY: i32 = 5;
pub const DEFAULT_CORRUPTION: i32 = 0;
pub const DEFAULT_SANITY: i32 = 7;
pub const DEFAULT_TRUST: i32 = 6;
pub const DEFAULT_FATE: i32 = 0;

/// Chapter label every new game starts in.
pub const DEFAULT_CHAPTER: &str = "PROLOGUE";
/// Title recorded when an ending arrives without one, or with a blank one.
pub const UNTITLED_ENDING: &str = "ENDING";
/// Speaker recorded in the log when a scene has none.
pub const NARRATOR: &str = "NARRATOR";

/// Literal version tag written into every save record.
pub const SAVE_VERSION: u32 = 1;
/// Literal version tag of the endings collection shape.
pub const ENDINGS_VERSION: u32 = 1;

pub const DEFAULT_STORAGE_PREFIX: &str = "canonfall";
pub const DEFAULT_ENDPOINT: &str = "/api/story";
pub const SAVE_KEY_SUFFIX: &str = "save";
pub const ENDINGS_KEY_SUFFIX: &str = "endings";
