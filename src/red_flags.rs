//! Acute-symptom keyword scan run before an analysis is dispatched.

/// Keywords in the order they are reported.
pub const RED_FLAGS: [&str; 15] = [
    "胸痛",
    "呼吸困难",
    "持续高烧",
    "抽搐",
    "昏厥",
    "意识不清",
    "呕血",
    "便血",
    "黑便",
    "剧烈腹痛",
    "剧烈头痛",
    "偏瘫",
    "口眼歪斜",
    "自杀",
    "自残",
];

/// Returns the keywords contained in `text`, in catalog order, each at most once.
pub fn detect_red_flags(text: &str) -> Vec<&'static str> {
    let folded = text.to_lowercase();
    RED_FLAGS
        .iter()
        .copied()
        .filter(|flag| folded.contains(&flag.to_lowercase()))
        .collect()
}

/// Notice shown ahead of the model output when any keyword matched.
pub fn warning_message(hits: &[&str]) -> String {
    format!(
        "我注意到你提到了一些可能的危险信号关键词：{}。如症状明显/加重，请优先及时线下就医或急救。",
        hits.join(", ")
    )
}
