// src/config/consts.rs

// Local state
pub const STORE_DIR: &str = ".store";
pub const SESSION_FILE: &str = "session.json";
pub const DEBUG_LOG_FILE: &str = "debug.log";
pub const CONFIG_FILE: &str = "attendance_sync.json";

// External record
pub const CSV_EXT: &str = "csv";
pub const DEFAULT_RECORD_DIR: &str = "records";
pub const DEFAULT_TABLE: &str = "attendance";
pub const DEFAULT_READ_RANGE: &str = "A:Z";
pub const UPLOAD_HEADERS: [&str; 3] = ["Name", "Gender", "Current Date"];

// Live view layout: nav arrow, name, gender, then one column per date
pub const RESERVED_LABELS: [&str; 1] = ["Gender"];
pub const NAME_HEADER_CELLS: usize = 1;
pub const LEADING_COLUMNS: usize = 3;
pub const GENDER_COLUMN: usize = 2;
pub const PAGE_MARKER: &str = "Attendance";

// Marking
pub const MARKED_CLASS: &str = "marked";
pub const CHECKED_GLYPH_HINT: &str = "evenodd";
pub const DENSITY_VALUE: &str = "100";
pub const DISPATCH_DELAY_MS: u64 = 10;
pub const DENSITY_SETTLE_MS: u64 = 250;

// Credentials
pub const TOKEN_ENV: &str = "ATTENDANCE_SYNC_TOKEN";
