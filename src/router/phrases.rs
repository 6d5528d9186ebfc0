// Phrase tables for intent detection
//
// Each table compiles once into a single case-insensitive alternation.
// Greeting and introduction phrases must stand as whole words; nearly every
// introduction question contains a short greeting ("yo" in "you", "hi" in
// "this") and would otherwise never be reached. API keywords match anywhere
// in the text, so "target" counts as containing "get".

use once_cell::sync::Lazy;
use regex::Regex;

pub const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "greetings", "hii", "hiii", "hiya", "heyy", "helloo", "hellooo",
    "good morning", "good afternoon", "good evening", "good night", "gm", "gn", "ga",
    "morning", "afternoon", "evening", "sup", "what's up", "wassup", "yo", "hola",
    "howdy", "ahoy", "salutations", "hi there", "hello there", "hey there",
    "good day", "good to see you", "nice to see you", "long time no see",
    "how are you", "how's it going", "how's things", "what's new", "what's happening",
    "hi friend", "hello friend", "hey friend", "how do you do", "hi hi",
    "hey hey", "hello hello", "hi again", "hello again", "hey again", "heyo",
    "hi folks", "hello everyone", "hey all", "hi team", "hello team", "hey team",
    "hi sir", "hello sir", "hey sir", "hi ma'am", "hello ma'am", "hey ma'am",
    "hi pal", "hello pal", "hey pal", "hi buddy", "hello buddy", "hey buddy",
    "hi mate", "hello mate", "hey mate", "hi dude", "hello dude", "hey dude",
    "heya", "howdy doody", "hi-ya", "hello-o", "hey-o", "hi-oh",
    "hi people", "hello people", "hey people", "hi guys", "hello guys", "hey guys",
    "hello folks", "hey folks", "hi y'all", "hello y'all", "hey y'all",
    "hi beautiful", "hello beautiful", "hey beautiful", "hi handsome", "hello handsome",
    "hey handsome", "hi stranger", "hello stranger", "hey stranger", "hi sunshine",
    "hello sunshine", "hey sunshine", "hi captain", "hello captain", "hey captain",
    "hi boss", "hello boss", "hey boss", "hi champ", "hello champ", "hey champ",
    "hi sport", "hello sport", "hey sport", "hi you", "hello you", "hey you",
];

pub const INTRODUCTION_QUESTIONS: &[&str] = &[
    "who are you", "what are you", "your name", "your purpose", "who is this",
    "what is your name", "what's your name", "who might you be", "who exactly are you",
    "what do you do", "what's your purpose", "what can you do", "what are your capabilities",
    "tell me about yourself", "describe yourself", "introduce yourself", "give me your intro",
    "who created you", "who made you", "who developed you", "who programmed you",
    "what are you called", "by what name are you called", "how should i call you",
    "what should i call you", "what do people call you", "what's your identity",
    "what's your function", "what's your job", "what's your role", "what's your mission",
    "what's your objective", "what's your goal", "what's your aim", "what's your task",
    "are you a bot", "are you a robot", "are you ai", "are you artificial intelligence",
    "are you human", "are you real", "are you a person", "are you a program",
    "what kind of bot are you", "what type of ai are you", "what sort of program are you",
    "what's your nature", "what's your essence", "what's your being", "what's your existence",
    "who are you really", "what are you exactly", "what exactly are you",
    "what's your deal", "what's your story", "what's your background", "what's your history",
    "what are you here for", "why do you exist", "why were you created", "why are you here",
    "what's your primary function", "what's your main purpose",
    "what do you specialize in", "what are you good at", "what can you help with",
    "what's your expertise", "what's your specialty", "what's your domain",
    "what's your focus", "what's your concentration", "what's your area",
    "what's your field", "what's your subject", "what's your topic",
    "what are you about", "what do you represent", "what do you stand for",
    "what's your brand", "what's your character", "what's your personality",
    "what's your disposition",
];

/// Words that mark an utterance as API related
pub const API_KEYWORDS: &[&str] = &[
    "api", "endpoint", "authentication", "token", "key",
    "image api", "video api", "ecommerce api", "qr code",
    "weather api", "profile photo", "jokes api", "apihub",
    "post", "get", "put", "delete", "request", "response",
    "header", "body", "parameter", "query", "status code",
];

/// A phrase table compiled into one matcher
pub struct PhraseSet {
    pattern: Regex,
}

impl PhraseSet {
    /// Match phrases only where they are not part of a longer word
    pub fn whole_words(phrases: &[&str]) -> Self {
        Self::compile(phrases, r"\b")
    }

    /// Match phrases anywhere, including inside words
    pub fn substrings(phrases: &[&str]) -> Self {
        Self::compile(phrases, "")
    }

    fn compile(phrases: &[&str], boundary: &str) -> Self {
        let alternation = phrases
            .iter()
            .map(|phrase| regex::escape(phrase))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("(?i){b}(?:{alt}){b}", b = boundary, alt = alternation))
            .expect("Failed to compile phrase table regex");
        Self { pattern }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

pub static GREETING_SET: Lazy<PhraseSet> = Lazy::new(|| PhraseSet::whole_words(GREETINGS));
pub static INTRODUCTION_SET: Lazy<PhraseSet> =
    Lazy::new(|| PhraseSet::whole_words(INTRODUCTION_QUESTIONS));
pub static API_KEYWORD_SET: Lazy<PhraseSet> = Lazy::new(|| PhraseSet::substrings(API_KEYWORDS));

pub fn is_greeting(text: &str) -> bool {
    GREETING_SET.matches(text)
}

pub fn is_introduction(text: &str) -> bool {
    INTRODUCTION_SET.matches(text)
}

pub fn is_api_related(text: &str) -> bool {
    API_KEYWORD_SET.matches(text)
}
