pub struct ErrorCode;

impl ErrorCode {
    // Engine CLI errors: E1xx
    pub const ENGINE_SPAWN_FAILED: &'static str = "E100";
    pub const ENGINE_COMMAND_FAILED: &'static str = "E101";
    pub const ENGINE_UNPARSABLE_OUTPUT: &'static str = "E102";
    pub const ENGINE_RESOURCE_NOT_FOUND: &'static str = "E103";

    // Build errors: B1xx
    pub const BUILD_CONTEXT_FAILED: &'static str = "B100";
    pub const BUILD_UNSAFE_ARCHIVE_PATH: &'static str = "B101";
    pub const BUILD_BAD_ARCHIVE: &'static str = "B102";

    // Request errors: A1xx
    pub const API_NOT_TAR: &'static str = "A100";
    pub const API_MISSING_QUERY: &'static str = "A101";
    pub const API_INVALID_QUERY: &'static str = "A102";

    // Configuration errors: C1xx
    pub const CONFIG_READ_FAILED: &'static str = "C100";
    pub const CONFIG_PARSE_FAILED: &'static str = "C101";
    pub const CONFIG_BAD_LISTEN_ADDRESS: &'static str = "C102";

    pub const INTERNAL: &'static str = "E000";
}
