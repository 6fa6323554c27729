/// Builds a content string from labeled sections in a fixed order,
/// silently omitting any section whose body is empty.
#[derive(Default)]
pub(crate) struct SectionBuilder {
    sections: Vec<String>,
}

impl SectionBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, label: &str, body: &str) -> &mut Self {
        let body = body.trim();
        if !body.is_empty() {
            self.sections.push(format!("{label}:\n{body}"));
        }
        self
    }

    pub(crate) fn push_list(&mut self, label: &str, items: &[String]) -> &mut Self {
        let filtered: Vec<&str> = items.iter().map(String::as_str).filter(|i| !i.trim().is_empty()).collect();
        if !filtered.is_empty() {
            self.sections.push(format!("{label}:\n{}", filtered.join("\n")));
        }
        self
    }

    pub(crate) fn build(&self) -> String {
        self.sections.join("\n\n")
    }
}
