use std::collections::HashMap;

use crate::catalog::QUESTIONS;
use crate::session::{Profile, SessionState};

const NOT_FILLED: &str = "未填写";

/// Borrowed view of everything the summary is built from.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub profile: &'a Profile,
    pub main_complaint: &'a str,
    pub supplement: &'a str,
    pub answers: &'a HashMap<&'static str, String>,
}

fn or_not_filled(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => NOT_FILLED,
    }
}

/// Section headings and labels for each catalog slot.
const ANSWER_SECTIONS: [(&str, &[(&str, &str)]); 2] = [
    (
        "【体质相关回答】",
        &[
            ("q2", "寒热感受（问题2）"),
            ("q3", "乏力情况（问题3）"),
            ("q4", "大便情况（问题4）"),
        ],
    ),
    (
        "【局部症状】",
        &[("q5", "睡眠情况（问题5）"), ("q6", "情绪状态（问题6）")],
    ),
];

/// Builds the structured intake document handed to the model.
///
/// The output depends only on its inputs, so the follow-up pipeline can
/// rebuild byte-identical context on every turn.
pub fn build_structured_summary(input: SummaryInput<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push("【基础信息】".to_string());
    let age = match input.profile.age {
        Some(age) if age > 0 => age.to_string(),
        _ => NOT_FILLED.to_string(),
    };
    parts.push(format!("- 年龄：{age}"));
    parts.push(format!("- 性别：{}", input.profile.gender));
    if let Some(menses) = input.profile.menses_if_applicable() {
        parts.push(format!("- 经期情况：{}", or_not_filled(Some(menses))));
    }
    parts.push(String::new());

    parts.push("【用户主诉】".to_string());
    parts.push(format!(
        "- 主诉（问题1）：{}",
        or_not_filled(Some(input.main_complaint))
    ));
    parts.push(format!(
        "- 补充说明（问题7）：{}",
        or_not_filled(Some(input.supplement))
    ));

    for (heading, slots) in ANSWER_SECTIONS {
        parts.push(String::new());
        parts.push(heading.to_string());
        for (id, label) in slots {
            let answer = input.answers.get(id).map(String::as_str);
            parts.push(format!("- {label}：{}", or_not_filled(answer)));
        }
    }

    parts.join("\n")
}

pub fn summarize(state: &SessionState) -> String {
    build_structured_summary(SummaryInput {
        profile: &state.profile,
        main_complaint: &state.main_complaint,
        supplement: &state.supplement,
        answers: &state.answers,
    })
}

/// Every user-supplied text the red-flag scan must see, newline-joined.
pub fn red_flag_scan_text(state: &SessionState) -> String {
    let mut fields: Vec<&str> = vec![state.main_complaint(), state.supplement()];
    fields.extend(QUESTIONS.iter().filter_map(|q| state.answer(q.id)));
    if let Some(menses) = state.profile.menses_if_applicable() {
        fields.push(menses);
    }
    fields.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Gender;

    fn summary_of(
        profile: &Profile,
        complaint: &str,
        supplement: &str,
        answers: &[(&'static str, &str)],
    ) -> String {
        let answers: HashMap<&'static str, String> = answers
            .iter()
            .map(|(id, a)| (*id, a.to_string()))
            .collect();
        build_structured_summary(SummaryInput {
            profile,
            main_complaint: complaint,
            supplement,
            answers: &answers,
        })
    }

    #[test]
    fn test_every_catalog_slot_is_covered() {
        let slots: Vec<&str> = ANSWER_SECTIONS
            .iter()
            .flat_map(|(_, slots)| slots.iter().map(|(id, _)| *id))
            .collect();
        let catalog: Vec<&str> = QUESTIONS.iter().map(|q| q.id).collect();
        assert_eq!(slots, catalog);
    }

    #[test]
    fn test_empty_session_summary() {
        let summary = summary_of(&Profile::default(), "", "", &[]);
        let expected = "【基础信息】\n\
                        - 年龄：未填写\n\
                        - 性别：男\n\
                        \n\
                        【用户主诉】\n\
                        - 主诉（问题1）：未填写\n\
                        - 补充说明（问题7）：未填写\n\
                        \n\
                        【体质相关回答】\n\
                        - 寒热感受（问题2）：未填写\n\
                        - 乏力情况（问题3）：未填写\n\
                        - 大便情况（问题4）：未填写\n\
                        \n\
                        【局部症状】\n\
                        - 睡眠情况（问题5）：未填写\n\
                        - 情绪状态（问题6）：未填写";
        assert_eq!(summary, expected);
    }

    #[test]
    fn test_female_profile_includes_menses() {
        let profile = Profile {
            age: Some(30),
            gender: Gender::Female,
            menses: String::new(),
        };
        let summary = summary_of(&profile, "痛经", "", &[]);
        assert!(summary.contains("- 年龄：30\n- 性别：女\n- 经期情况：未填写"));
        assert!(summary.contains("- 主诉（问题1）：痛经"));
    }

    #[test]
    fn test_male_profile_omits_menses_even_if_set() {
        let profile = Profile {
            menses: "规律".to_string(),
            ..Profile::default()
        };
        let summary = summary_of(&profile, "", "", &[]);
        assert!(!summary.contains("经期情况"));
    }

    #[test]
    fn test_answers_render_in_place_and_are_trimmed() {
        let answers = [("q4", "  软硬适中（排便顺畅） "), ("q6", "   ")];
        let summary = summary_of(&Profile::default(), "腹胀", "", &answers);
        assert!(summary.contains("- 大便情况（问题4）：软硬适中（排便顺畅）\n"));
        assert!(summary.ends_with("- 情绪状态（问题6）：未填写"));
    }

    #[test]
    fn test_summary_is_deterministic() {
        let profile = Profile {
            age: Some(45),
            gender: Gender::Female,
            menses: "不规律".to_string(),
        };
        let answers = [("q2", "明显怕冷（喜热饮、手脚凉）"), ("q5", "容易惊醒")];
        let a = summary_of(&profile, "失眠", "工作忙", &answers);
        let b = summary_of(&profile.clone(), "失眠", "工作忙", &answers);
        assert_eq!(a, b);
    }

    #[test]
    fn test_scan_text_collects_free_text_and_answers() {
        let mut state = SessionState::new();
        state.main_complaint = "胸痛".to_string();
        state.supplement = "夜里".to_string();
        state.answers.insert("q3", "经常乏力".to_string());
        state.profile.gender = Gender::Female;
        state.profile.menses = "痛经明显".to_string();
        assert_eq!(red_flag_scan_text(&state), "胸痛\n夜里\n经常乏力\n痛经明显");
    }
}
