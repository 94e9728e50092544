//! 题目解析服务 - 业务能力层
//!
//! 只负责"把工作流返回的文本解析为结构化题目"，不关心任务状态
//!
//! ## 文本格式
//!
//! 输入按空行切分为若干题块，每个题块依次包含：
//!
//! ```text
//! Question: Capital of France?
//! (A) Paris
//! (B) Lyon
//! (C) Nice
//! (D) Tours
//! Correct Answer: A
//! Explanation: Paris is the capital.
//! ```
//!
//! - 标记前缀 `Question:` / `Correct Answer:` / `Explanation:` 不区分大小写，
//!   只在第一个冒号处切分，内容中的冒号原样保留
//! - 选项行以标号开头：`(A)`、`A)`、`A.`、`A:`（字母 a–h 或数字 1–9），存储时去掉标号
//! - 选项的标号类别（字母或数字）取答案行之前最后一个带标号的行；
//!   选项是该类别中最后一组标号不重复的连续行（连线题的 List I 与选项都用字母时，
//!   `A.`–`D.` 与 `(a)`–`(d)` 是两组），之前的行都并入题干，
//!   选项之后的其他行接在该选项后面
//! - `Explanation:` 可省略，之后的行并入解析
//! - 既没有 `Question:` 也没有 `Correct Answer:` 的题块（例如开场白）直接忽略
//!
//! 正确答案可以写成标号（`A`、`(A)`、`Option A`）、选项原文，
//! 或者冒号前带标号（`B: Lyon`），最终统一保存为选项原文。
//! 匹配顺序：题块自身的标号 → 选项原文 → 跨类别按位置（`2` 对应第二个字母选项）。

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::question::{ParseError, ParseErrorReason, Question, OPTION_COUNT};

/// 解析结果：有效题目与被跳过题块的错误
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub questions: Vec<Question>,
    pub errors: Vec<ParseError>,
}

/// 解析工作流返回的原始文本
///
/// 不会因为格式错误而失败：无效题块被跳过并记录在 `errors` 中，
/// 其余有效题块不受影响。
pub fn parse_questions(raw: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (block_index, block) in split_blocks(raw).into_iter().enumerate() {
        let lines: Vec<Line<'_>> = block.into_iter().map(Line::classify).collect();

        if !is_candidate(&lines) {
            debug!("题块 #{} 不包含题目标记，已忽略", block_index);
            continue;
        }

        match parse_block(&lines) {
            Ok(question) => outcome.questions.push(question),
            Err(rejection) => {
                let error = ParseError {
                    block_index,
                    reason: rejection.reason,
                    detail: rejection.detail,
                };
                debug!("{}", error);
                outcome.errors.push(error);
            }
        }
    }

    outcome
}

// ========== 切分与分类 ==========

/// 按空行切分题块，每行已去除首尾空白
fn split_blocks(raw: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelFamily {
    Letter,
    Digit,
}

#[derive(Debug, Clone, Copy)]
enum LineKind<'a> {
    Question(&'a str),
    Answer(&'a str),
    Explanation(&'a str),
    Option {
        label: char,
        family: LabelFamily,
        text: &'a str,
    },
    Plain,
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    raw: &'a str,
    kind: LineKind<'a>,
}

impl<'a> Line<'a> {
    fn classify(raw: &'a str) -> Self {
        let kind = if let Some(content) = capture_content(question_marker(), raw) {
            LineKind::Question(content)
        } else if let Some(content) = capture_content(answer_marker(), raw) {
            LineKind::Answer(content)
        } else if let Some(content) = capture_content(explanation_marker(), raw) {
            LineKind::Explanation(content)
        } else if let Some((label, text)) = split_option_label(raw) {
            LineKind::Option {
                label,
                family: label_family(label),
                text,
            }
        } else {
            LineKind::Plain
        };

        Self { raw, kind }
    }
}

fn is_candidate(lines: &[Line<'_>]) -> bool {
    lines
        .iter()
        .any(|l| matches!(l.kind, LineKind::Question(_) | LineKind::Answer(_)))
}

// ========== 题块解析 ==========

struct BlockRejection {
    reason: ParseErrorReason,
    detail: String,
}

fn reject(reason: ParseErrorReason, detail: impl Into<String>) -> BlockRejection {
    BlockRejection {
        reason,
        detail: detail.into(),
    }
}

fn parse_block(lines: &[Line<'_>]) -> Result<Question, BlockRejection> {
    let (question_pos, question_head) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| match l.kind {
            LineKind::Question(text) => Some((i, text)),
            _ => None,
        })
        .ok_or_else(|| reject(ParseErrorReason::MissingQuestion, "没有 Question: 行"))?;

    if question_head.is_empty() {
        return Err(reject(ParseErrorReason::EmptyQuestion, "Question: 之后没有内容"));
    }

    let rest = &lines[question_pos + 1..];

    let (answer_pos, answer_text) = rest
        .iter()
        .enumerate()
        .find_map(|(i, l)| match l.kind {
            LineKind::Answer(text) => Some((i, text)),
            _ => None,
        })
        .ok_or_else(|| {
            reject(
                ParseErrorReason::MissingCorrectAnswer,
                "没有 Correct Answer: 行",
            )
        })?;

    let explanation_pos = rest
        .iter()
        .position(|l| matches!(l.kind, LineKind::Explanation(_)));

    // 题干与选项区：到答案行（或提前出现的解析行）为止
    let body_end = match explanation_pos {
        Some(pos) if pos < answer_pos => pos,
        _ => answer_pos,
    };
    let body = &rest[..body_end];

    let (text, labelled_options) = collect_question_and_options(question_head, body);

    if labelled_options.len() != OPTION_COUNT {
        return Err(reject(
            ParseErrorReason::OptionCountMismatch,
            format!("找到 {} 个选项", labelled_options.len()),
        ));
    }

    if let Some(pos) = labelled_options.iter().position(|(_, o)| o.is_empty()) {
        return Err(reject(
            ParseErrorReason::EmptyOption,
            format!("第 {} 个选项为空", pos + 1),
        ));
    }

    let correct_index = resolve_correct_option(answer_text, &labelled_options).ok_or_else(|| {
        reject(
            ParseErrorReason::UnresolvedCorrectAnswer,
            format!("'{}'", answer_text),
        )
    })?;

    let explanation = explanation_pos
        .map(|pos| collect_explanation(rest, pos, answer_pos))
        .unwrap_or_default();

    let mut options = labelled_options.into_iter().map(|(_, o)| o);
    let options: [String; OPTION_COUNT] = std::array::from_fn(|_| options.next().unwrap_or_default());
    let correct_option = options[correct_index].clone();

    Ok(Question {
        text,
        options,
        correct_option,
        explanation,
    })
}

/// 拆分题干与选项
fn collect_question_and_options(
    question_head: &str,
    body: &[Line<'_>],
) -> (String, Vec<(char, String)>) {
    let option_family = body.iter().rev().find_map(|l| match l.kind {
        LineKind::Option { family, .. } => Some(family),
        _ => None,
    });
    let options_start = option_family.map_or(body.len(), |family| last_run_start(body, family));

    let mut question_parts = vec![question_head.to_string()];
    question_parts.extend(body[..options_start].iter().map(|l| l.raw.to_string()));
    let mut options: Vec<(char, String)> = Vec::new();

    for line in &body[options_start..] {
        match line.kind {
            LineKind::Option {
                label,
                family,
                text,
            } if Some(family) == option_family => {
                options.push((label, text.to_string()));
            }
            _ => match options.last_mut() {
                Some((_, option)) => {
                    option.push(' ');
                    option.push_str(line.raw);
                }
                None => question_parts.push(line.raw.to_string()),
            },
        }
    }

    let options = options
        .into_iter()
        .map(|(label, text)| (label, text.trim().to_string()))
        .collect();

    (question_parts.join("\n").trim().to_string(), options)
}

/// 最后一组选项的起始位置：同类别标号再次出现时开始新的一组
fn last_run_start(body: &[Line<'_>], family: LabelFamily) -> usize {
    let mut start = body.len();
    let mut seen: Vec<char> = Vec::new();

    for (i, line) in body.iter().enumerate() {
        if let LineKind::Option {
            label,
            family: line_family,
            ..
        } = line.kind
        {
            if line_family != family {
                continue;
            }
            if seen.is_empty() || seen.contains(&label) {
                start = i;
                seen.clear();
            }
            seen.push(label);
        }
    }

    start
}

/// 收集解析：解析行及其后续行，遇到答案行或题块结束为止
fn collect_explanation(rest: &[Line<'_>], explanation_pos: usize, answer_pos: usize) -> String {
    let mut parts = Vec::new();

    if let LineKind::Explanation(head) = rest[explanation_pos].kind {
        if !head.is_empty() {
            parts.push(head);
        }
    }

    for (offset, line) in rest[explanation_pos + 1..].iter().enumerate() {
        if explanation_pos + 1 + offset == answer_pos {
            break;
        }
        parts.push(line.raw);
    }

    parts.join("\n").trim().to_string()
}

/// 将正确答案解析为选项下标
fn resolve_correct_option(answer: &str, options: &[(char, String)]) -> Option<usize> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }

    // 可能的标号：A / (A) / Option A，或冒号前（B: Lyon）、带标号前缀（(B) Lyon）
    let labels: Vec<char> = [
        bare_label(answer),
        answer.split_once(':').and_then(|(head, _)| bare_label(head)),
        split_option_label(answer).map(|(label, _)| label),
    ]
    .into_iter()
    .flatten()
    .collect();

    // 1. 单独的标号，按题块自身的标号匹配
    if let Some(index) = bare_label(answer).and_then(|label| index_for_own_label(label, options)) {
        return Some(index);
    }

    // 2. 选项原文
    if let Some(index) = options.iter().position(|(_, o)| o == answer) {
        return Some(index);
    }
    let lowered = answer.to_lowercase();
    if let Some(index) = options.iter().position(|(_, o)| o.to_lowercase() == lowered) {
        return Some(index);
    }

    // 3. 其余写法的标号，先按题块标号，再跨类别按位置
    labels
        .iter()
        .find_map(|label| index_for_own_label(*label, options))
        .or_else(|| labels.iter().find_map(|label| index_for_position(*label, options)))
}

fn index_for_own_label(label: char, options: &[(char, String)]) -> Option<usize> {
    options.iter().position(|(l, _)| *l == label)
}

/// 按标准位置匹配（a–d / 1–4）
fn index_for_position(label: char, options: &[(char, String)]) -> Option<usize> {
    let index = match label_family(label) {
        LabelFamily::Letter => (label as u32).checked_sub('a' as u32)? as usize,
        LabelFamily::Digit => (label.to_digit(10)? as usize).checked_sub(1)?,
    };
    (index < options.len()).then_some(index)
}

// ========== 标记与标号识别 ==========

fn question_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)^question(?:\s*\d+)?\s*:(.*)$"))
}

fn answer_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)^correct\s+answer\s*:(.*)$"))
}

fn explanation_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)^explanation\s*:(.*)$"))
}

/// 选项标号：`(A)`、`A)`、`A.`、`A:`，裸标号后必须跟空白或行尾
fn option_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(r"^(?:\((?P<paren>[A-Ha-h1-9])\)\s*|(?P<bare>[A-Ha-h1-9])[.):](?:\s+|$))(?P<text>.*)$")
    })
}

/// 只由标号组成的答案
fn bare_label_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)^(?:option\s*)?\(?([a-h1-9])\)?\.?$"))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("内置正则无效 {}: {}", pattern, e))
}

fn capture_content<'a>(marker: &Regex, line: &'a str) -> Option<&'a str> {
    marker
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn split_option_label(line: &str) -> Option<(char, &str)> {
    let caps = option_label().captures(line)?;
    let label = caps.name("paren").or_else(|| caps.name("bare"))?;
    let label = label.as_str().chars().next()?.to_ascii_lowercase();
    let text = caps.name("text").map(|m| m.as_str().trim()).unwrap_or_default();
    Some((label, text))
}

fn bare_label(text: &str) -> Option<char> {
    let caps = bare_label_pattern().captures(text.trim())?;
    caps.get(1)?.as_str().chars().next().map(|c| c.to_ascii_lowercase())
}

fn label_family(label: char) -> LabelFamily {
    if label.is_ascii_digit() {
        LabelFamily::Digit
    } else {
        LabelFamily::Letter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRANCE: &str = "Question: Capital of France?\n(A) Paris\n(B) Lyon\n(C) Nice\n(D) Tours\nCorrect Answer: A\nExplanation: Paris is the capital.";

    fn block_with_answer(answer: &str) -> String {
        format!(
            "Question: Capital of France?\nA) Paris\nB) Lyon\nC) Nice\nD) Tours\nCorrect Answer: {}",
            answer
        )
    }

    #[test]
    fn test_parse_single_block() {
        let outcome = parse_questions(FRANCE);

        assert!(outcome.errors.is_empty());
        assert_eq!(
            outcome.questions,
            vec![Question {
                text: "Capital of France?".to_string(),
                options: [
                    "Paris".to_string(),
                    "Lyon".to_string(),
                    "Nice".to_string(),
                    "Tours".to_string()
                ],
                correct_option: "Paris".to_string(),
                explanation: "Paris is the capital.".to_string(),
            }]
        );
    }

    #[test]
    fn test_three_options_is_count_mismatch() {
        let raw = "Question: Largest planet?\n(A) Jupiter\n(B) Mars\n(C) Venus\nCorrect Answer: A";
        let outcome = parse_questions(raw);

        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].reason.code(), "option_count_mismatch");
        assert_eq!(outcome.errors[0].block_index, 0);
    }

    #[test]
    fn test_five_options_is_count_mismatch() {
        let raw = "Question: Pick one\n(A) 1\n(B) 2\n(C) 3\n(D) 4\n(E) 5\nCorrect Answer: A";
        let outcome = parse_questions(raw);

        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.errors[0].reason, ParseErrorReason::OptionCountMismatch);
    }

    #[test]
    fn test_corrupt_block_does_not_affect_siblings() {
        let corrupt = "Question: Broken?\n(A) w\n(B) x\n(C) y\n(D) z\nExplanation: no answer here";
        let second = "Question: Longest river?\n(A) Ganga\n(B) Nile\n(C) Amazon\n(D) Yamuna\nCorrect Answer: B\nExplanation: Nile.";
        let raw = format!("{}\n\n{}\n\n{}", FRANCE, corrupt, second);

        let outcome = parse_questions(&raw);

        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.questions[0].correct_option, "Paris");
        assert_eq!(outcome.questions[1].text, "Longest river?");
        assert_eq!(outcome.questions[1].correct_option, "Nile");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].block_index, 1);
        assert_eq!(outcome.errors[0].reason, ParseErrorReason::MissingCorrectAnswer);
    }

    #[test]
    fn test_correct_answer_forms_normalize_to_text() {
        for answer in ["B", "(B)", "b", "B.", "Option B", "Lyon", "lyon", "B: Lyon", "(B) Lyon", "2"] {
            let outcome = parse_questions(&block_with_answer(answer));
            assert_eq!(outcome.errors, vec![], "answer form {:?}", answer);
            assert_eq!(outcome.questions[0].correct_option, "Lyon", "answer form {:?}", answer);
        }
    }

    #[test]
    fn test_unresolvable_answer_is_rejected() {
        let outcome = parse_questions(&block_with_answer("Marseille"));

        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.errors[0].reason, ParseErrorReason::UnresolvedCorrectAnswer);
    }

    #[test]
    fn test_embedded_colons_are_preserved() {
        let raw = "Question: Which ratio is correct: golden or silver?\n(A) Ratio: 2:1\n(B) Ratio: 3:2\n(C) 1:1\n(D) None\nCorrect Answer: Ratio: 3:2\nExplanation: Note: see chapter 3: ratios.";
        let outcome = parse_questions(raw);

        let question = &outcome.questions[0];
        assert_eq!(question.text, "Which ratio is correct: golden or silver?");
        assert_eq!(question.options[0], "Ratio: 2:1");
        assert_eq!(question.correct_option, "Ratio: 3:2");
        assert_eq!(question.explanation, "Note: see chapter 3: ratios.");
    }

    #[test]
    fn test_empty_and_unstructured_input() {
        assert_eq!(parse_questions(""), ParseOutcome::default());
        assert_eq!(parse_questions("   \n\n  \n"), ParseOutcome::default());
        assert_eq!(
            parse_questions("Here are your questions.\n\nHope this helps!"),
            ParseOutcome::default()
        );
    }

    #[test]
    fn test_missing_explanation_yields_empty_string() {
        let outcome = parse_questions(&block_with_answer("A"));
        assert_eq!(outcome.questions[0].explanation, "");
    }

    #[test]
    fn test_preamble_and_crlf_are_tolerated() {
        let raw = format!(
            "Sure! Here are the questions:\r\n\r\n{}\r\n",
            FRANCE.replace('\n', "\r\n")
        );
        let outcome = parse_questions(&raw);

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(outcome.questions[0].options[3], "Tours");
    }

    #[test]
    fn test_multi_statement_question_keeps_statements_in_text() {
        let raw = "Question: Consider the following statements:\n1. The RBI was established in 1935.\n2. The RBI was nationalised in 1949.\nWhich of the statements given above is/are correct?\n(a) 1 only\n(b) 2 only\n(c) Both 1 and 2\n(d) Neither 1 nor 2\nCorrect Answer: (c)\nExplanation: Both statements are correct.";
        let outcome = parse_questions(raw);

        assert!(outcome.errors.is_empty());
        let question = &outcome.questions[0];
        assert!(question.text.starts_with("Consider the following statements:"));
        assert!(question.text.contains("2. The RBI was nationalised in 1949."));
        assert!(question.text.ends_with("is/are correct?"));
        assert_eq!(question.options[2], "Both 1 and 2");
        assert_eq!(question.correct_option, "Both 1 and 2");
    }

    #[test]
    fn test_empty_question_and_empty_option() {
        let empty_question = "Question:\n(A) a\n(B) b\n(C) c\n(D) d\nCorrect Answer: A";
        let empty_option = "Question: Q?\n(A) a\n(B)\n(C) c\n(D) d\nCorrect Answer: A";
        let outcome = parse_questions(&format!("{}\n\n{}", empty_question, empty_option));

        assert!(outcome.questions.is_empty());
        assert_eq!(outcome.errors[0].reason, ParseErrorReason::EmptyQuestion);
        assert_eq!(outcome.errors[1].reason, ParseErrorReason::EmptyOption);
        assert_eq!(outcome.errors[1].block_index, 1);
    }

    #[test]
    fn test_answer_without_question_is_reported() {
        let outcome = parse_questions("(A) a\n(B) b\nCorrect Answer: A");

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].reason, ParseErrorReason::MissingQuestion);
    }

    #[test]
    fn test_multiline_explanation_and_numbered_question_marker() {
        let raw = "question 3: Who wrote the Arthashastra?\n1) Kautilya\n2) Kalidasa\n3) Banabhatta\n4) Harisena\ncorrect answer: 1\nexplanation: Kautilya, also called Chanakya.\nHe advised Chandragupta Maurya.";
        let outcome = parse_questions(raw);

        let question = &outcome.questions[0];
        assert_eq!(question.text, "Who wrote the Arthashastra?");
        assert_eq!(question.correct_option, "Kautilya");
        assert_eq!(question.correct_index(), Some(0));
        assert_eq!(
            question.explanation,
            "Kautilya, also called Chanakya.\nHe advised Chandragupta Maurya."
        );
    }

    #[test]
    fn test_numeric_answer_prefers_option_text_over_position() {
        let block = |answer: &str| {
            format!(
                "Question: How many Union Territories have a legislature?\n(A) 4\n(B) 3\n(C) 2\n(D) 1\nCorrect Answer: {}",
                answer
            )
        };

        for (answer, expected) in [("1", "1"), ("3", "3"), ("A", "4"), ("(d)", "1")] {
            let outcome = parse_questions(&block(answer));
            assert_eq!(outcome.errors, vec![], "answer {:?}", answer);
            assert_eq!(outcome.questions[0].correct_option, expected, "answer {:?}", answer);
        }
    }

    #[test]
    fn test_match_the_column_uses_last_option_group() {
        let raw = "Question: Match List I with List II:\nList I\nA. RBI\nB. SEBI\nC. IRDAI\nD. PFRDA\nList II\n1. Banking\n2. Securities market\n3. Insurance\n4. Pensions\n(a) A-1, B-2, C-3, D-4\n(b) A-2, B-1, C-4, D-3\n(c) A-1, B-3, C-2, D-4\n(d) A-4, B-3, C-2, D-1\nCorrect Answer: (a)\nExplanation: Each regulator oversees its own sector.";
        let outcome = parse_questions(raw);

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        let question = &outcome.questions[0];
        assert!(question.text.starts_with("Match List I with List II:"));
        assert!(question.text.contains("D. PFRDA"));
        assert!(question.text.ends_with("4. Pensions"));
        assert_eq!(question.options[0], "A-1, B-2, C-3, D-4");
        assert_eq!(question.options[3], "A-4, B-3, C-2, D-1");
        assert_eq!(question.correct_option, "A-1, B-2, C-3, D-4");
    }

    #[test]
    fn test_bare_dot_and_colon_option_labels() {
        for separator in [".", ":"] {
            let raw = format!(
                "Question: Largest ocean?\nA{0} Pacific\nB{0} Atlantic\nC{0} Indian\nD{0} Arctic\nCorrect Answer: C",
                separator
            );
            let outcome = parse_questions(&raw);

            assert!(outcome.errors.is_empty(), "separator {:?}", separator);
            let question = &outcome.questions[0];
            assert_eq!(question.text, "Largest ocean?");
            assert_eq!(question.options, ["Pacific", "Atlantic", "Indian", "Arctic"]);
            assert_eq!(question.correct_option, "Indian");
        }
    }
}
