use regex::Regex;

/// Sections the model is instructed to produce, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Translation,
    Analysis,
    LatinItalianDictionary,
    LatinGrammarManual,
    ItalianGrammarManual,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Translation,
        Section::Analysis,
        Section::LatinItalianDictionary,
        Section::LatinGrammarManual,
        Section::ItalianGrammarManual,
    ];

    /// Name used inside the `<name>...</name>` markers.
    pub fn tag(self) -> &'static str {
        match self {
            Section::Translation => "translation",
            Section::Analysis => "analysis",
            Section::LatinItalianDictionary => "latin_italian_dictionary",
            Section::LatinGrammarManual => "latin_grammar_manual",
            Section::ItalianGrammarManual => "italian_grammar_manual",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Translation => "Translation",
            Section::Analysis => "Grammatical analysis",
            Section::LatinItalianDictionary => "Latin-Italian dictionary",
            Section::LatinGrammarManual => "Latin grammar notes",
            Section::ItalianGrammarManual => "Italian grammar notes",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Content of every known section, as found in one buffer.
///
/// Missing and still-streaming sections are both represented by an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedSections([String; 5]);

impl ExtractedSections {
    pub fn get(&self, section: Section) -> &str {
        &self.0[section.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Section, &str)> {
        Section::ALL.into_iter().map(|s| (s, self.get(s)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(String::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    /// Opening marker not seen yet.
    Absent,
    /// Opening marker seen, closing marker not yet.
    Streaming,
    Complete,
}

/// Pulls tagged sections out of a (possibly incomplete) model response.
///
/// Stateless: every call rescans the whole buffer, which is fine for replies of a few KB.
#[derive(Debug, Clone)]
pub struct TagExtractor {
    patterns: Vec<(Section, Regex)>,
}

impl Default for TagExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TagExtractor {
    pub fn new() -> Self {
        let patterns = Section::ALL
            .into_iter()
            .map(|section| {
                let tag = regex::escape(section.tag());
                let regex = Regex::new(&format!("(?s)<{tag}>(.*?)</{tag}>")).expect("valid regex");
                (section, regex)
            })
            .collect();
        TagExtractor { patterns }
    }

    pub fn extract(&self, text: &str) -> ExtractedSections {
        let mut sections = ExtractedSections::default();
        for (section, regex) in &self.patterns {
            if let Some(content) = regex.captures(text).and_then(|c| c.get(1)) {
                sections.0[section.index()] = content.as_str().trim().to_owned();
            }
        }
        sections
    }

    pub fn state(&self, text: &str, section: Section) -> SectionState {
        let (_, regex) = &self.patterns[section.index()];
        if regex.is_match(text) {
            SectionState::Complete
        } else if text.contains(&format!("<{}>", section.tag())) {
            SectionState::Streaming
        } else {
            SectionState::Absent
        }
    }
}
