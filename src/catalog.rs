//! Fixed interview content: the ordered question list, the assistant prompts
//! that frame it, and the canned follow-up questions offered after the report.

/// A fixed-choice intake question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub id: &'static str,
    /// Markdown shown as the assistant prompt
    pub prompt: &'static str,
    pub quick_options: [&'static str; 4],
    /// Example answer used in the free-text placeholder
    pub placeholder_hint: &'static str,
}

/// Sentinel option that skips the remaining questions.
pub const ANALYZE_NOW: &str = "基于当前信息直接分析";

pub const QUESTIONS: [Question; 5] = [
    Question {
        id: "q2",
        prompt: "谢谢，我明白了！为了更贴近你的身体状态，我会继续从一些日常感受入手，慢慢拼凑出整体的调子。\n\n\
                 **下面的问题没有对错，只需要按你平时最真实的感觉来选即可。**\n\n\
                 在中医里，怕冷或怕热，常常反映的是身体整体偏向的“底色”。\n\
                 **请问你日常更怕冷还是怕热？**",
        quick_options: [
            "明显怕冷（喜热饮、手脚凉）",
            "明显怕热（喜冷饮、易上火）",
            "冷热都不明显",
            ANALYZE_NOW,
        ],
        placeholder_hint: "冬天怕冷夏天怕热",
    },
    Question {
        id: "q3",
        prompt: "除了冷热感受，精力状态也很能说明身体是否在“透支运行”。\
                 **请问你日常是否容易感到疲劳乏力？**",
        quick_options: ["经常乏力", "几乎不乏力", "偶尔乏力（熬夜/劳累后）", ANALYZE_NOW],
        placeholder_hint: "晨起乏力",
    },
    Question {
        id: "q4",
        prompt: "中医常说“脾胃为后天之本”，消化和排便情况，往往是身体内部状态的直接反馈。\
                 **请问你最近的大便性状怎么样？**",
        quick_options: [
            "稀溏不成形（或黏马桶）",
            "干结难解（或排便费力）",
            "软硬适中（排便顺畅）",
            ANALYZE_NOW,
        ],
        placeholder_hint: "每天腹泻 1 次",
    },
    Question {
        id: "q5",
        prompt: "睡眠是身体自我修复的重要时段，它的质量常常和白天的状态相互影响。\
                 **请问你最近的睡眠情况怎么样？**",
        quick_options: ["入睡困难", "容易惊醒", "睡眠质量好", ANALYZE_NOW],
        placeholder_hint: "总是睡不醒",
    },
    Question {
        id: "q6",
        prompt: "情绪变化不仅是心理感受，在中医里也会反映到身体的运行节奏上。\
                 **请问你最近的情绪状态怎么样？**",
        quick_options: ["经常烦躁焦虑", "经常低落压抑", "情绪平稳", ANALYZE_NOW],
        placeholder_hint: "工作压力大时烦躁",
    },
];

/// Prompt id for the opening main-complaint question.
pub const OPENING_ID: &str = "q1";
/// Prompt id for the optional supplement question.
pub const SUPPLEMENT_ID: &str = "q7";
/// Prompt id for the greeting shown once the report exists.
pub const POSTCHAT_ID: &str = "postchat";

pub const OPENING_PROMPT: &str = "为了更好地理解你的情况，我们先从最主要的不适开始：\n\n\
**请用一两句话描述你现在最主要的不适症状**\n\n\
如果不确定从哪里说起，也可以按“什么时候开始—哪里不舒服—程度如何—有什么诱因/缓解”来描述。";

pub const SUPPLEMENT_PROMPT: &str = "谢谢你的配合。最后还有一个可选的补充，能帮助我把建议做得更贴合：\n\n\
**是否还有你觉得重要、但前面没问到的情况？**\n\n\
你可以在下方输入框简单补充一下。";

pub const POSTCHAT_GREETING: &str =
    "分析已完成。接下来你可以放心继续提问，我会结合前面的信息尽量讲清楚、讲明白。";

pub const MISSING_KEY_NOTICE: &str =
    "未检测到 DeepSeek API Key：请在设置中输入，或通过环境变量 `DEEPSEEK_API_KEY` / 配置文件提供。";

pub const PROVIDER_ERROR_NOTICE: &str = "抱歉，调用模型服务时出现问题，本次回答未能生成。请稍后重试。";

/// A canned follow-up trigger: short button label plus the question it sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Faq {
    pub label: &'static str,
    pub question: &'static str,
}

pub const FAQS: [Faq; 3] = [
    Faq {
        label: "我更接近哪一种体质",
        question: "结合我前面提供的信息，我更接近哪一种体质？请说明理由。",
    },
    Faq {
        label: "你是根据哪些表现，判断我有这些问题的？",
        question: "结合我前面提供的信息，你是根据哪些表现，判断我有这些问题的？",
    },
    Faq {
        label: "如果只做一两件事，最重要建议是什么？",
        question: "结合我前面提供的信息，如果只做一两件事，最重要建议是什么？",
    },
];

pub const MENSES_OPTIONS: [&str; 6] = [
    "规律",
    "不规律",
    "痛经明显",
    "经量偏少/色淡",
    "经量偏多/色深",
    "不确定",
];

pub const COMPLAINT_PLACEHOLDER: &str = "如：最近总是疲劳、胃口差，饭后腹胀，睡眠也不好";
pub const SUPPLEMENT_PLACEHOLDER: &str = "如：饮食习惯、作息变化、近期情绪事件等。";
pub const FOLLOWUP_PLACEHOLDER: &str = "继续提问";
pub const DEFAULT_PLACEHOLDER: &str = "请输入…";

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_question_ids_unique_and_distinct_from_sentinels() {
        let ids: HashSet<_> = QUESTIONS.iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), QUESTIONS.len());
        for sentinel in [OPENING_ID, SUPPLEMENT_ID, POSTCHAT_ID] {
            assert!(!ids.contains(sentinel));
        }
    }

    #[test]
    fn test_every_question_offers_analyze_now_last() {
        for q in &QUESTIONS {
            assert_eq!(q.quick_options[3], ANALYZE_NOW, "question {}", q.id);
            assert_eq!(
                q.quick_options.iter().filter(|o| **o == ANALYZE_NOW).count(),
                1
            );
        }
    }
}
