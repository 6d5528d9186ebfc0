// Query router
// Decides how each chat utterance is answered and when it becomes a ticket

mod commands;
mod decision;
mod phrases;
mod prompt;

pub use commands::Command;
pub use decision::{
    classify, normalize, strip_markup, truncate_title, QueryRouter, RouteOutcome, SideEffect,
    Verdict, FAILURE_NO_TICKET_REPLY, FAILURE_REPLY, GREETING_REPLY, INTRODUCTION_REPLY,
    OUT_OF_SCOPE_NO_TICKET_REPLY, OUT_OF_SCOPE_REPLY,
};
pub use phrases::{is_api_related, is_greeting, is_introduction, PhraseSet};
pub use prompt::SYSTEM_PROMPT;
