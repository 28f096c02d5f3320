/// Name reported by the root endpoint.
pub const APP_NAME: &str = "loeysingsregister";

// Tables
pub const LOEYSING: &str = "loeysing";
pub const VERKSEMD: &str = "verksemd";
pub const MIGRASJON: &str = "migrasjon";
pub const SEKVENS: &str = "sekvens";

/// Public Enhetsregisteret endpoint for single organizations.
pub const BRREG_ENHETER_URL: &str = "https://data.brreg.no/enhetsregisteret/api/enheter";

// OpenAPI tags
pub const SYSTEM_TAG: &str = "System";
pub const LOEYSING_TAG: &str = "Løysing";
pub const VERKSEMD_TAG: &str = "Verksemd";
