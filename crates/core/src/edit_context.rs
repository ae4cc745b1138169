/// Editing state handed down from the page root to every section.
///
/// There is no process-wide edit flag: whoever renders a page builds one
/// `EditContext` and passes it to each section, which asks for its own
/// [`SectionEditState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditContext {
    editable: bool,
    open_section: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionEditState {
    ReadOnly,
    /// Edit mode is on but this section's editor is closed.
    Editable,
    /// This section's editor is open.
    Open,
}

impl EditContext {
    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn editing() -> Self {
        Self {
            editable: true,
            open_section: None,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn open_section(&self) -> Option<&str> {
        self.open_section.as_deref()
    }

    /// Open `key`'s editor, closing whichever was open. No-op when read-only.
    pub fn open(&mut self, key: &str) {
        if self.editable {
            self.open_section = Some(key.to_string());
        }
    }

    pub fn close(&mut self) {
        self.open_section = None;
    }

    /// Toggle edit mode. Leaving edit mode closes any open editor.
    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        if !editable {
            self.open_section = None;
        }
    }

    pub fn for_section(&self, key: &str) -> SectionEditState {
        match (self.editable, self.open_section.as_deref()) {
            (false, _) => SectionEditState::ReadOnly,
            (true, Some(open)) if open == key => SectionEditState::Open,
            (true, _) => SectionEditState::Editable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_context_never_opens() {
        let mut ctx = EditContext::read_only();
        ctx.open("hero");
        assert_eq!(ctx.for_section("hero"), SectionEditState::ReadOnly);
        assert_eq!(ctx.open_section(), None);
    }

    #[test]
    fn opening_one_section_closes_the_other() {
        let mut ctx = EditContext::editing();
        ctx.open("hero");
        assert_eq!(ctx.for_section("hero"), SectionEditState::Open);
        assert_eq!(ctx.for_section("faq"), SectionEditState::Editable);

        ctx.open("faq");
        assert_eq!(ctx.for_section("hero"), SectionEditState::Editable);
        assert_eq!(ctx.for_section("faq"), SectionEditState::Open);
    }

    #[test]
    fn leaving_edit_mode_closes_editor() {
        let mut ctx = EditContext::editing();
        ctx.open("team");
        ctx.set_editable(false);
        assert_eq!(ctx.open_section(), None);
        assert_eq!(ctx.for_section("team"), SectionEditState::ReadOnly);
    }
}
