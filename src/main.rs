use anyhow::Result;
use chrono::Local;
use colored::*;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use wellness_intake::catalog::{FAQS, MENSES_OPTIONS};
use wellness_intake::controller::accepts_quick_option;
use wellness_intake::{AssistantService, Config, Event, Gender, Role, SessionState};

const DEFAULT_LOG_FILTER: &str = "info";

enum Command {
    Event(Event),
    Help,
    ShowProfile,
    Quit,
    Invalid(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they do not interleave with the conversation
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load());
    let service = AssistantService::new(config)?;
    let mut state = service.new_session();

    print_banner();
    let mut shown = render_new(&state, 0);
    print_controls(&service, &state);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", format!("[{}] >", state.placeholder()).dimmed());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let event = match parse_command(&line, &state) {
            Command::Event(event) => event,
            Command::Help => {
                print_help();
                continue;
            }
            Command::ShowProfile => {
                print_profile(&state);
                continue;
            }
            Command::Quit => break,
            Command::Invalid(msg) => {
                println!("{}", msg.yellow());
                continue;
            }
        };

        if matches!(event, Event::Reset) {
            shown = 0;
        }

        // Entries the service appends before the stream (the user's question,
        // safety notices) must render first, so fragments only drive a progress line.
        let mut fragments = 0usize;
        let result = service
            .handle(&mut state, event, |_: &str| {
                if fragments == 0 {
                    print!("{}", "正在生成".dimmed());
                }
                fragments += 1;
                if fragments % 20 == 0 {
                    print!("{}", ".".dimmed());
                }
                let _ = std::io::stdout().flush();
            })
            .await;
        if fragments > 0 {
            println!();
        }
        if let Err(e) = result {
            println!("{}", e.to_string().yellow());
        }

        shown = render_new(&state, shown);
        print_controls(&service, &state);
    }

    println!("再见，祝你身体健康。");
    Ok(())
}

/// `RUST_LOG` directives when present and valid, otherwise the default filter.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn parse_command(line: &str, state: &SessionState) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Event(Event::Text(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    if let Ok(n) = name.parse::<usize>() {
        return match n.checked_sub(1) {
            Some(index) => Command::Event(Event::QuickOption(index)),
            None => Command::Invalid("选项编号从 1 开始".to_string()),
        };
    }

    let mut profile = state.profile.clone();
    match name {
        "quit" | "exit" => Command::Quit,
        "help" => Command::Help,
        "profile" => Command::ShowProfile,
        "analyze" => Command::Event(Event::StartAnalysis),
        "reset" => Command::Event(Event::Reset),
        "key" => Command::Event(Event::SetApiKey(arg.to_string())),
        "faq" => match arg.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
            Some(index) => Command::Event(Event::Faq(index)),
            None => Command::Invalid("用法：/faq <1-3>".to_string()),
        },
        "age" => {
            if arg.is_empty() {
                profile.age = None;
            } else {
                match arg.parse::<u8>() {
                    Ok(age) if age <= 120 => profile.age = Some(age),
                    _ => return Command::Invalid("年龄需在 0-120 之间".to_string()),
                }
            }
            Command::Event(Event::UpdateProfile(profile))
        }
        "gender" => {
            profile.gender = match arg {
                "m" | "male" | "男" => Gender::Male,
                "f" | "female" | "女" => Gender::Female,
                _ => return Command::Invalid("用法：/gender 男|女".to_string()),
            };
            Command::Event(Event::UpdateProfile(profile))
        }
        "menses" => {
            profile.menses = match arg.parse::<usize>() {
                Ok(n) if (1..=MENSES_OPTIONS.len()).contains(&n) => {
                    MENSES_OPTIONS[n - 1].to_string()
                }
                _ => arg.to_string(),
            };
            Command::Event(Event::UpdateProfile(profile))
        }
        _ => Command::Invalid(format!("未知命令 /{name}，输入 /help 查看帮助")),
    }
}

/// Prints transcript entries from `from` on and returns the new render position.
fn render_new(state: &SessionState, from: usize) -> usize {
    for entry in state.transcript().iter().skip(from) {
        let at = entry.at.with_timezone(&Local).format("%H:%M").to_string();
        match entry.role {
            Role::Assistant => {
                println!("{} {} {}", at.dimmed(), "助手:".green().bold(), entry.text)
            }
            Role::User => {
                println!("{} {} {}", at.dimmed(), "你:".cyan().bold(), entry.text.dimmed())
            }
        }
        println!();
    }
    state.transcript().len()
}

fn print_controls(service: &AssistantService, state: &SessionState) {
    if accepts_quick_option(state) {
        for (i, option) in state.quick_options().iter().enumerate() {
            println!("  {} {}", format!("/{}", i + 1).bold(), option);
        }
    }
    if state.awaiting_analysis() {
        if service.analysis_enabled(state) {
            println!("  {} 开始分析", "/analyze".bold());
        } else {
            println!(
                "{}",
                "未检测到 DeepSeek API Key。请用 /key 输入，或设置环境变量 DEEPSEEK_API_KEY。"
                    .yellow()
            );
        }
    }
    if state.report_generated() {
        println!("{}", "你可能还想问：".bold());
        for (i, faq) in FAQS.iter().enumerate() {
            println!("  {} {}", format!("/faq {}", i + 1).bold(), faq.label);
        }
    }
}

fn print_banner() {
    println!("{}", "🌿 中医智能小助手".green().bold());
    println!(
        "{}",
        "本产品仅为 AI 技术演示，内容仅供参考，不能替代专业医疗诊断。".dimmed()
    );
    println!("操作流程：01 填写基础信息 → 02 描述症状 → 03 诊疗建议（输入 /help 查看命令）");
    println!();
}

fn print_help() {
    println!("{}", "命令：".bold());
    println!("  /1../4          选择快捷选项");
    println!("  /analyze        开始分析");
    println!("  /faq <1-3>      常见追问");
    println!("  /age <岁>       设置年龄（留空清除）");
    println!("  /gender 男|女   设置性别");
    println!("  /menses <1-6|文字>  设置经期情况");
    for (i, option) in MENSES_OPTIONS.iter().enumerate() {
        println!("      {}. {}", i + 1, option);
    }
    println!("  /key <API Key>  设置本次会话的 DeepSeek API Key");
    println!("  /profile        查看基础信息");
    println!("  /reset          清空聊天（保留基础信息与 Key）");
    println!("  /quit           退出");
}

fn print_profile(state: &SessionState) {
    let profile = &state.profile;
    let age = profile
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "未填写".to_string());
    println!("年龄：{age}  性别：{}", profile.gender);
    if let Some(menses) = profile.menses_if_applicable() {
        println!("经期情况：{}", if menses.is_empty() { "未填写" } else { menses });
    }
}
