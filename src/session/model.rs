use serde::{Deserialize, Serialize};

pub type LemmaId = i64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    #[default]
    Reading,
    Listening,
    Quiz,
    Reintro,
}

impl ReviewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewMode::Reading => "reading",
            ReviewMode::Listening => "listening",
            ReviewMode::Quiz => "quiz",
            ReviewMode::Reintro => "reintro",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reading" => Some(ReviewMode::Reading),
            "listening" => Some(ReviewMode::Listening),
            "quiz" => Some(ReviewMode::Quiz),
            "reintro" => Some(ReviewMode::Reintro),
            _ => None,
        }
    }

    /// Only reading and listening sessions are fetched from the server.
    pub fn is_session_mode(self) -> bool {
        matches!(self, ReviewMode::Reading | ReviewMode::Listening)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComprehensionSignal {
    Understood,
    Partial,
    NoIdea,
    GrammarConfused,
}

impl ComprehensionSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            ComprehensionSignal::Understood => "understood",
            ComprehensionSignal::Partial => "partial",
            ComprehensionSignal::NoIdea => "no_idea",
            ComprehensionSignal::GrammarConfused => "grammar_confused",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "understood" => Some(ComprehensionSignal::Understood),
            "partial" => Some(ComprehensionSignal::Partial),
            "no_idea" => Some(ComprehensionSignal::NoIdea),
            "grammar_confused" => Some(ComprehensionSignal::GrammarConfused),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeState {
    New,
    Encountered,
    Acquiring,
    Learning,
    Known,
    Lapsed,
    Suspended,
    #[default]
    #[serde(other)]
    Unknown,
}

impl KnowledgeState {
    pub fn is_known(self) -> bool {
        matches!(self, KnowledgeState::Learning | KnowledgeState::Known)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceWord {
    pub lemma_id: Option<LemmaId>,
    pub surface_form: String,
    #[serde(default)]
    pub gloss_en: Option<String>,
    #[serde(default)]
    pub is_function_word: bool,
    #[serde(default)]
    pub knowledge_state: KnowledgeState,
    #[serde(default)]
    pub stability: Option<f64>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub frequency_rank: Option<u32>,
}

impl SentenceWord {
    /// Words that take part in the mark cycle and lookups.
    pub fn is_markable(&self) -> bool {
        self.lemma_id.is_some() && !self.is_function_word
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub sentence_id: Option<i64>,
    pub primary_lemma_id: LemmaId,
    #[serde(default)]
    pub primary_arabic: String,
    #[serde(default)]
    pub primary_gloss: String,
    #[serde(default)]
    pub words: Vec<SentenceWord>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

impl ReviewItem {
    pub fn is_word_only(&self) -> bool {
        self.sentence_id.is_none()
    }

    /// Words that feed the outcome ledger. A word-only item without word
    /// rows still records its primary lemma.
    pub fn ledger_words(&self) -> Vec<SentenceWord> {
        if self.words.is_empty() {
            vec![SentenceWord {
                lemma_id: Some(self.primary_lemma_id),
                surface_form: self.primary_arabic.clone(),
                gloss_en: Some(self.primary_gloss.clone()),
                ..SentenceWord::default()
            }]
        } else {
            self.words.clone()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntroCandidate {
    pub lemma_id: LemmaId,
    #[serde(default)]
    pub lemma_ar: String,
    #[serde(default)]
    pub gloss_en: String,
    #[serde(default)]
    pub root: Option<String>,
    pub insert_at: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReintroCard {
    pub lemma_id: LemmaId,
    #[serde(default)]
    pub lemma_ar: String,
    #[serde(default)]
    pub gloss_en: String,
    #[serde(default)]
    pub times_seen: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub items: Vec<ReviewItem>,
    #[serde(default)]
    pub intro_candidates: Vec<IntroCandidate>,
    #[serde(default)]
    pub reintro_cards: Vec<ReintroCard>,
    #[serde(default)]
    pub grammar_features: Vec<String>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RootSibling {
    pub lemma_id: LemmaId,
    #[serde(default)]
    pub lemma_ar: String,
    #[serde(default)]
    pub gloss_en: Option<String>,
    #[serde(default)]
    pub knowledge_state: KnowledgeState,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub lemma_id: LemmaId,
    #[serde(default)]
    pub lemma_ar: String,
    #[serde(default)]
    pub gloss_en: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub root_meaning: Option<String>,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub frequency_rank: Option<u32>,
    #[serde(default)]
    pub root_family: Vec<RootSibling>,
    /// Synthesized locally after a failed fetch.
    #[serde(default)]
    pub is_fallback: bool,
}

impl LookupResult {
    pub fn known_sibling_count(&self) -> usize {
        self.root_family
            .iter()
            .filter(|s| s.lemma_id != self.lemma_id && s.knowledge_state.is_known())
            .count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WrapUpCard {
    pub lemma_id: LemmaId,
    #[serde(default)]
    pub lemma_ar: String,
    #[serde(default)]
    pub gloss_en: String,
    #[serde(default)]
    pub is_failed: bool,
}
