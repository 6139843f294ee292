use anyhow::Result;
use console::style;
use strum::IntoEnumIterator;

use crate::personas::PersonaKind;

pub fn execute() -> Result<()> {
    for kind in PersonaKind::iter() {
        let persona = kind.persona();
        println!(
            "{} {}",
            style(kind.to_string()).bold().green(),
            style(format!("({})", persona.title)).dim()
        );
        println!("  {}", persona.description);
        for prompt in persona.example_prompts {
            println!("  {} {}", style("e.g.").dim(), prompt);
        }
        println!();
    }
    Ok(())
}
