// Process exit codes for `quakewatch`

pub const SUCCESS: i32 = 0;
pub const EXECUTION_ERROR: i32 = 1;
/// Bad arguments, config file or input file
pub const INPUT_ERROR: i32 = 2;
/// The sample source could not be opened
pub const SOURCE_ERROR: i32 = 3;
/// The stream ended before the baseline was captured
pub const CALIBRATION_INCOMPLETE: i32 = 4;
/// Cancelled with Ctrl-C (128 + SIGINT)
pub const INTERRUPTED: i32 = 130;
