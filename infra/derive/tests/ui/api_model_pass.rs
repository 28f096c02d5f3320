use lreg_derive::api_model;

#[api_model]
pub struct NyLoeysing {
    pub namn: String,
    pub url: String,
}

#[api_model(deny_unknown_fields = false, rename_all = "snake_case")]
pub struct Tolerant {
    pub verksemd_id: Option<i64>,
}

fn main() {
    let _ = NyLoeysing { namn: "UUTilsynet".to_owned(), url: "https://www.uutilsynet.no".to_owned() };
    let _ = Tolerant { verksemd_id: None };
}
