//! Line-oriented REPL over stdin
//!
//! 한 줄씩 읽어 `Console`에 넘기고 결과를 출력한다. 명령 하나가 원격 호출까지
//! 끝난 뒤에 다음 줄을 읽는다.

use crate::render::Printer;
use elite_console::{Console, Reply};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Run until `Exit` or end of input.
pub async fn run(mut console: Console, printer: Printer, agent: Option<String>) -> anyhow::Result<()> {
    if let Some(agent) = agent {
        let line = format!("Interact \"{}\"", agent);
        handle(&mut console, &printer, &line).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        printer.prompt(&console.prompt());
        let Some(line) = lines.next_line().await? else {
            debug!("End of input");
            println!();
            break;
        };
        if !handle(&mut console, &printer, &line).await {
            break;
        }
    }
    Ok(())
}

/// Handle one line; `false` once the operator asked to exit.
async fn handle(console: &mut Console, printer: &Printer, line: &str) -> bool {
    match console.handle(line).await {
        Ok(Reply::Exit) => false,
        Ok(reply) => {
            let agent = console.session().map(|s| s.name().to_string());
            printer.reply(&reply, agent.as_deref());
            true
        }
        Err(e) => {
            printer.failure(&e, line.trim());
            true
        }
    }
}
