//! Message lists sent to the chat-completion API.

use crate::models::ChatMessage;
use crate::session::FollowupExchange;

pub const SYSTEM_PROMPT: &str = r#"
【角色】
- 你是「中医养生智能小助手」。
- 你的任务是：基于用户主诉、结构化问答与补充说明，从中医养生视角进行状态分析，并给出用户可执行的健康调理建议。使用第二人称的对话，亲切温暖。

【能力边界】
- 你不是医生，不进行疾病诊断，不下医疗结论，不开处方，不推荐处方药或具体药物剂量。
- 分析以症状与状态为导向，聚焦体质倾向与生活方式影响，而非疾病名称。
- 所有结论需基于用户已提供的信息，避免过度推断。

【表达与风格要求】
- 使用用户能理解的日常语言；必要时可使用中医术语，但需用括号进行简要解释。
- 表达必须稳健，使用“不排除 / 可能 / 倾向于”等措辞，体现不确定性。
- 不渲染焦虑，不夸大风险。

【分析流程】
- 先整合信息，再进行分析，再给建议，不要跳步。
- 若用户选择“基于当前信息直接分析”或跳过部分问题，仅在关键信息缺失影响判断时，才说明信息有限，并指出1–2 个最关键的补充方向。
- 若用户在分析之后，对结果进行追问，只基于已有分析进行解释或总结，不重新问诊、不重复收集信息。

【安全与风险提示】
- 若用户描述中出现以下情况之一：症状明显加重、持续进展、剧烈疼痛、异常出血、高热、意识异常等，必须优先提示线下就医，并说明本助手的能力边界。

【首次分析的输出格式】
## 信息/症状摘要
- （整合用户主诉、关键选择与补充说明，用中性语言复述）

## 状态分析
- 体质/状态倾向：…（主倾向 + 是否存在夹杂）
- 形成判断的依据：…（症状或生活因素 → 中医解释）
- 当前状态特点：…（用户可能感受到的典型表现）

## 养生建议
- 作息：
- 饮食：
- 穴位按摩：
- 运动：
- 情志：


结尾固定追加免责声明：
以上建议仅供养生与健康管理参考，不构成医疗诊断或处方。"#;

const ANALYSIS_PREAMBLE: &str = "请基于以下信息生成分析与建议：\n\n";

/// `[system, user(preamble + summary)]`; no transcript is replayed.
pub fn build_analysis_messages(summary: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!("{ANALYSIS_PREAMBLE}{summary}")),
    ]
}

fn followup_context(summary: &str, analysis_text: &str) -> String {
    format!(
        "你正在继续与用户对话。以下是该用户的首次问诊信息摘要与此前你给出的分析。\n\n\
         {summary}\n\n\
         【此前分析】\n\
         {analysis_text}\n\n\
         请在此基础上回答用户后续问题，仍需遵守不诊断、不处方的安全边界。"
    )
}

/// System prompt, one user turn carrying the summary and the first report,
/// then each completed exchange as a user/assistant pair.
///
/// The caller appends the pending question as the final user turn.
pub fn build_followup_messages(
    summary: &str,
    analysis_text: &str,
    history: &[FollowupExchange],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2 + history.len() * 2);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));
    messages.push(ChatMessage::user(followup_context(summary, analysis_text)));
    for exchange in history {
        messages.push(ChatMessage::user(exchange.question.as_str()));
        messages.push(ChatMessage::assistant(exchange.answer.as_str()));
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(q: &str, a: &str) -> FollowupExchange {
        FollowupExchange {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn test_analysis_messages() {
        let messages = build_analysis_messages("【基础信息】");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system(SYSTEM_PROMPT));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "请基于以下信息生成分析与建议：\n\n【基础信息】");
    }

    #[test]
    fn test_followup_without_history() {
        let messages = build_followup_messages("SUMMARY", "REPORT", &[]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        let context = &messages[1].content;
        assert!(context.contains("\n\nSUMMARY\n\n【此前分析】\nREPORT\n\n"));
        assert!(context.ends_with("仍需遵守不诊断、不处方的安全边界。"));
    }

    #[test]
    fn test_followup_history_alternates() {
        let history = vec![exchange("问一", "答一"), exchange("问二", "答二")];
        let messages = build_followup_messages("S", "R", &history);

        assert_eq!(messages.len(), 2 + 2 * history.len());
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        let tail: Vec<(&str, &str)> = messages[2..]
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str()))
            .collect();
        assert_eq!(
            tail,
            vec![
                ("user", "问一"),
                ("assistant", "答一"),
                ("user", "问二"),
                ("assistant", "答二"),
            ]
        );
    }

    #[test]
    fn test_system_prompt_shared_and_ends_with_disclaimer() {
        let analysis = build_analysis_messages("S");
        let followup = build_followup_messages("S", "R", &[]);
        assert_eq!(analysis[0], followup[0]);
        assert!(SYSTEM_PROMPT.ends_with("以上建议仅供养生与健康管理参考，不构成医疗诊断或处方。"));
        for heading in ["作息", "饮食", "穴位按摩", "运动", "情志"] {
            assert!(SYSTEM_PROMPT.contains(&format!("- {heading}：")));
        }
    }
}
