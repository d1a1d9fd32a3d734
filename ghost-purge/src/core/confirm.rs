/*!
Yes/no questions put to the user.
*/

use console::Term;
use dialoguer::Confirm;
use tracing::debug;

pub trait Confirmer {
    /// Ask `prompt`. Anything but an explicit yes is a no.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Prompts on the terminal, defaulting to no. Without an interactive
/// terminal every question is answered no.
#[derive(Debug, Default)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, prompt: &str) -> bool {
        let term = Term::stderr();
        if !term.is_term() {
            debug!("Not a terminal, declining: {}", prompt);
            return false;
        }
        match Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact_on(&term)
        {
            Ok(answer) => answer,
            Err(e) => {
                debug!("Prompt failed, declining: {}", e);
                false
            }
        }
    }
}
