//! Input tokenizer
//!
//! 두 가지 모드:
//! - `Quoted`: 공백 분리, `"..."` 그룹은 하나의 토큰 (따옴표 제거)
//! - `Raw`: 공백 분리만, 따옴표는 그대로 유지
//!
//! 백슬래시는 항상 문자 그대로 취급된다 (Windows 경로 보존).

/// How a command line is split into tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenMode {
    #[default]
    Quoted,
    Raw,
}

/// Split `input` into tokens.
pub fn tokenize(input: &str, mode: TokenMode) -> Vec<String> {
    match mode {
        TokenMode::Raw => input.split_whitespace().map(str::to_string).collect(),
        TokenMode::Quoted => tokenize_quoted(input),
    }
}

fn tokenize_quoted(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                // `""` still yields an (empty) token
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    // unterminated quote closes at end of line
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// First whitespace-delimited word of `input`
pub fn command_word(input: &str) -> &str {
    input.split_whitespace().next().unwrap_or("")
}

/// Everything after the first word, with leading whitespace removed
pub fn strip_command_word(input: &str) -> &str {
    let trimmed = input.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(index) => trimmed[index..].trim_start(),
        None => "",
    }
}

/// Rejoin `args[from..]` with single spaces
pub fn join_from(args: &[String], from: usize) -> String {
    args.get(from..).map(|rest| rest.join(" ")).unwrap_or_default()
}
