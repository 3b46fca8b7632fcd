#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use interlinear_sync::{
    alignment::PanelRole,
    bus::{Message, MessageBus, MessageType, PanelEndpoint},
    extractor::{Extractor, WordToken},
    resolver::PanelTokens,
    tokenizer::Tokenizer,
    verse_ref::VerseRef,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Hebrew original of "the judges judged the judges".
pub const UHB_JUDGES: &str = r#"\w שֹׁפְטִים|lemma="שָׁפַט" strong="H8199" x-morph="He,Vqrmpa"\w* \w וְשָׁפְטוּ|lemma="שָׁפַט" strong="c:H8199" x-morph="He,C:Vqp3cp"\w*"#;

/// Literal translation; both "judges" align to the same source word.
pub const ULT_JUDGES: &str = r#"\w the\w* \zaln-s |x-strong="H8199" x-lemma="שָׁפַט" x-morph="He,Vqrmpa" x-occurrence="1" x-occurrences="1" x-content="שֹׁפְטִים"\*\w judges|x-occurrence="1" x-occurrences="2"\w*\zaln-e\* \zaln-s |x-strong="c:H8199" x-lemma="שָׁפַט" x-morph="He,C:Vqp3cp" x-occurrence="1" x-occurrences="1" x-content="וְשָׁפְטוּ"\*\w judged\w*\zaln-e\* \w the\w* \zaln-s |x-strong="H8199" x-lemma="שָׁפַט" x-morph="He,Vqrmpa" x-occurrence="1" x-occurrences="1" x-content="שֹׁפְטִים"\*\w judges|x-occurrence="2" x-occurrences="2"\w*\zaln-e\*."#;

/// Simplified translation with one aligned word.
pub const UST_JUDGES: &str = r#"\zaln-s |x-strong="H8199" x-lemma="שָׁפַט" x-morph="He,Vqrmpa" x-occurrence="1" x-occurrences="1" x-content="שֹׁפְטִים"\*\w The\w* \w leaders\w*\zaln-e\* \w decided\w* \w cases\w*."#;

pub fn judges_ref() -> VerseRef {
    VerseRef::new("JDG", 2, "18")
}

pub fn extract(verse_ref: &VerseRef, markup: &str) -> Vec<WordToken> {
    let parsed = Tokenizer::new().tokenize(markup);
    Extractor::default().extract(verse_ref, &parsed).tokens
}

/// A panel that records what it receives and reports fixed tokens.
pub struct RecordingPanel {
    role: PanelRole,
    tokens: Mutex<Vec<WordToken>>,
    received: Mutex<Vec<Message>>,
}

impl RecordingPanel {
    pub fn new(role: PanelRole, tokens: Vec<WordToken>) -> Arc<Self> {
        Arc::new(Self {
            role,
            tokens: Mutex::new(tokens),
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(PanelRole::Target, Vec::new())
    }

    pub fn set_tokens(&self, tokens: Vec<WordToken>) {
        *self.tokens.lock().unwrap() = tokens;
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_types(&self) -> Vec<MessageType> {
        self.received().iter().map(Message::message_type).collect()
    }

    pub fn last(&self) -> Option<Message> {
        self.received.lock().unwrap().last().cloned()
    }
}

impl PanelEndpoint for RecordingPanel {
    fn receive(&self, message: &Message) {
        self.received.lock().unwrap().push(message.clone());
    }

    fn current_tokens(&self) -> PanelTokens {
        PanelTokens::new(self.role, self.tokens.lock().unwrap().clone())
    }
}

pub struct JudgesPanels {
    pub bus: Arc<MessageBus>,
    pub uhb: Arc<RecordingPanel>,
    pub ult: Arc<RecordingPanel>,
    pub ust: Arc<RecordingPanel>,
}

/// A bus with the three judges panels registered as `uhb`, `ult`, `ust`.
pub fn judges_panels() -> JudgesPanels {
    let verse_ref = judges_ref();
    let bus = Arc::new(MessageBus::with_defaults());
    let uhb = RecordingPanel::new(PanelRole::Original, extract(&verse_ref, UHB_JUDGES));
    let ult = RecordingPanel::new(PanelRole::Target, extract(&verse_ref, ULT_JUDGES));
    let ust = RecordingPanel::new(PanelRole::Target, extract(&verse_ref, UST_JUDGES));
    bus.register("uhb", uhb.clone()).unwrap();
    bus.register("ult", ult.clone()).unwrap();
    bus.register("ust", ust.clone()).unwrap();
    JudgesPanels { bus, uhb, ult, ust }
}
