// FILE: src/core/constants.rs

// Directive syntax
pub const DIRECTIVE_MARKER: &str = "//@";

// Keywords whose argument text is a comma-separated list
pub const LIST_KEYWORDS: &[&str] = &["require", "master"];

// Source files
pub const SOURCE_EXTENSION: &str = "js";
pub const HIDDEN_PREFIX: char = '_';
pub const BYTE_ORDER_MARK: char = '\u{feff}';
pub const OUTPUT_LINE_ENDING: &str = "\n";

// Inclusion banners
pub const REQUIRED_BANNER_START: &str = "/***** Required ";
pub const REQUIRED_BANNER_ENDING: &str = "/***** Ending ";
pub const REQUIRED_BANNER_END: &str = " *****/";

// Dependency bubbling: minimum number of children sharing a require
pub const BUBBLE_THRESHOLD: usize = 2;

// Output directory probe
pub const OUTPUT_PROBE_FILE: &str = ".transcend";

// Configuration
pub const DEFAULT_CONFIG_FILE: &str = "transcend.json";
pub const DEFAULT_MINIFIER: &str = "uglifyjs";
pub const CONFIG_INPUT_KEY: &str = "input";
pub const CONFIG_OUTPUT_KEY: &str = "output";
pub const CONFIG_UGLIFY_KEY: &str = "uglify";
pub const CONFIG_MINIFIER_KEY: &str = "minifier";

// Watch mode
pub const WATCH_DEBOUNCE_MS: u64 = 100;
