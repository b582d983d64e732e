//! `analyst prompt`: print the composed system prompt.

use std::process::ExitCode;

use analyst_chain::prompts;

pub fn run(sections: bool) -> ExitCode {
    println!("{}", render(sections));
    ExitCode::SUCCESS
}

fn render(sections: bool) -> String {
    if !sections {
        return prompts::system_prompt();
    }
    prompts::sections()
        .iter()
        .map(|(name, text)| format!("## {name}\n\n{text}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}
