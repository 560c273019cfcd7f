use crate::charts::DashboardCharts;
use crate::dataset::{self, DerivedDatasets};
use crate::error::{ParseError, RejectionReason, SourceError};
use crate::locale::{LocaleContext, SubscriptionId};
use crate::models::{Selection, SelectionDetails, SelectionId};
use crate::resolver;
use crate::selection::{PendingChoice, SelectionSet};
use crate::table::{self, ParsedTable};
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub struct LoadedTable {
    pub table: ParsedTable,
    pub institutions: Vec<String>,
    pub years: Vec<String>,
}

impl LoadedTable {
    fn new(table: ParsedTable) -> Self {
        let institutions = table.institutions();
        let years = table.years();
        Self {
            table,
            institutions,
            years,
        }
    }
}

#[derive(Debug)]
pub enum LoadState {
    Loading,
    Ready(LoadedTable),
    Failed(SourceError),
}

/// One dashboard: the loaded table, the user's picks and the locale.
///
/// Derived datasets are rebuilt on every query; nothing is cached.
#[derive(Debug)]
pub struct DashboardSession {
    state: LoadState,
    selections: SelectionSet,
    locale: LocaleContext,
}

impl DashboardSession {
    pub fn new(locale: LocaleContext) -> Self {
        Self {
            state: LoadState::Loading,
            selections: SelectionSet::new(),
            locale,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&SourceError> {
        match &self.state {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Complete the one-shot table fetch; check `error()` afterwards.
    pub fn finish_load(&mut self, fetched: Result<String, SourceError>) {
        match fetched {
            Ok(raw) => {
                // A parse failure is already recorded as `Failed` by `load`.
                if let Err(err) = self.load(&raw) {
                    debug!(%err, "fetched table did not parse");
                }
            }
            Err(err) => self.fail(err),
        }
    }

    /// Parse and install a table. Existing selections are kept; picks whose
    /// institution is no longer present simply stop resolving.
    pub fn load(&mut self, raw: &str) -> Result<(), ParseError> {
        match table::parse(raw) {
            Ok(parsed) => {
                let loaded = LoadedTable::new(parsed);
                info!(
                    institutions = loaded.institutions.len(),
                    years = loaded.years.len(),
                    warnings = loaded.table.warnings.len(),
                    "enrollment table ready"
                );
                self.state = LoadState::Ready(loaded);
                Ok(())
            }
            Err(err) => {
                self.fail(err.clone().into());
                Err(err)
            }
        }
    }

    pub fn fail(&mut self, err: SourceError) {
        error!(error = %err, "enrollment source unavailable");
        self.state = LoadState::Failed(err);
    }

    fn loaded(&self) -> Option<&LoadedTable> {
        match &self.state {
            LoadState::Ready(loaded) => Some(loaded),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&ParsedTable> {
        self.loaded().map(|l| &l.table)
    }

    pub fn institutions(&self) -> &[String] {
        self.loaded().map(|l| l.institutions.as_slice()).unwrap_or(&[])
    }

    pub fn years(&self) -> &[String] {
        self.loaded().map(|l| l.years.as_slice()).unwrap_or(&[])
    }

    pub fn add_selection(&mut self, institution: &str, year: &str) -> Result<Selection, RejectionReason> {
        let result = self.selections.add(institution, year);
        if let Err(reason) = &result {
            warn!(institution, year, %reason, "selection rejected");
        }
        result
    }

    pub fn pending(&mut self) -> &mut PendingChoice {
        &mut self.selections.pending
    }

    pub fn add_pending(&mut self) -> Result<Selection, RejectionReason> {
        let result = self.selections.add_pending();
        if let Err(reason) = &result {
            warn!(%reason, "pending selection rejected");
        }
        result
    }

    pub fn remove_selection(&mut self, id: SelectionId) {
        self.selections.remove(id);
    }

    pub fn active_selections(&self) -> &[Selection] {
        self.selections.list()
    }

    pub fn selections(&self) -> &SelectionSet {
        &self.selections
    }

    /// `None` while loading, after a failed load, or with no selections.
    pub fn derived_datasets(&self) -> Option<DerivedDatasets> {
        let loaded = self.loaded()?;
        dataset::build(self.selections.list(), &loaded.table, &loaded.years)
    }

    pub fn charts(&self) -> Option<DashboardCharts> {
        DashboardCharts::from_datasets(&self.derived_datasets()?)
    }

    pub fn selection_details(&self, id: SelectionId) -> Option<SelectionDetails> {
        let selection = self.selections.get(id)?;
        resolver::details(selection, self.table()?)
    }

    /// Localized notice for a rejected pick.
    pub fn notice(&self, reason: RejectionReason) -> String {
        self.locale.translate(reason.message_key())
    }

    pub fn locale(&self) -> &LocaleContext {
        &self.locale
    }

    pub fn set_locale(&mut self, code: &str) -> bool {
        self.locale.set_locale(code)
    }

    pub fn available_locales(&self) -> Vec<String> {
        self.locale.available_locales()
    }

    pub fn subscribe_locale(&mut self, observer: impl FnMut(&str) + 'static) -> SubscriptionId {
        self.locale.subscribe(observer)
    }

    pub fn unsubscribe_locale(&mut self, id: SubscriptionId) {
        self.locale.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "Institution,Total_2019,Men_2019\nA,100,48\nB,50,25\n";

    fn session() -> DashboardSession {
        DashboardSession::new(LocaleContext::new("en"))
    }

    #[test]
    fn loading_session_answers_empty() {
        let mut s = session();
        assert!(s.is_loading());
        s.add_selection("A", "2019").unwrap();
        assert!(s.derived_datasets().is_none());
        assert!(s.charts().is_none());
        assert!(s.institutions().is_empty());
    }

    #[test]
    fn ready_session_builds_datasets() {
        let mut s = session();
        s.load(TABLE).unwrap();
        assert_eq!(s.institutions(), ["A".to_string(), "B".to_string()]);
        assert!(s.derived_datasets().is_none());
        let pick = s.add_selection("A", "2019").unwrap();
        let data = s.derived_datasets().unwrap();
        assert_eq!(data.comparison_list[0].men, 48.0);
        assert_eq!(s.selection_details(pick.id).unwrap().men, "48");
    }

    #[test]
    fn failed_load_is_sticky_and_empty() {
        let mut s = session();
        assert!(s.load("").is_err());
        assert!(matches!(s.error(), Some(SourceError::Parse(_))));
        s.add_selection("A", "2019").unwrap();
        assert!(s.derived_datasets().is_none());
    }

    #[test]
    fn fetch_failure_is_recorded() {
        let mut s = session();
        let err = SourceError::Empty {
            location: "table.csv".to_string(),
        };
        s.finish_load(Err(err));
        assert!(matches!(s.error(), Some(SourceError::Empty { .. })));
        assert!(s.years().is_empty());
    }

    #[test]
    fn fetched_text_without_institution_column_fails_the_session() {
        let mut s = session();
        s.finish_load(Ok("Name,Total_2019\nA,1\n".to_string()));
        assert!(matches!(
            s.error(),
            Some(SourceError::Parse(ParseError::MissingInstitutionColumn))
        ));
        assert!(s.table().is_none());

        s.finish_load(Ok(TABLE.to_string()));
        assert!(s.error().is_none());
        assert_eq!(s.years(), ["2019".to_string()]);
    }

    #[test]
    fn reload_keeps_stale_selection_out_of_charts() {
        let mut s = session();
        s.load(TABLE).unwrap();
        s.add_selection("A", "2019").unwrap();
        s.add_selection("B", "2019").unwrap();
        s.load("Institution,Total_2019,Men_2019\nA,100,48\n").unwrap();
        assert_eq!(s.active_selections().len(), 2);
        let data = s.derived_datasets().unwrap();
        assert_eq!(data.comparison_list.len(), 1);
        assert_eq!(data.comparison_list[0].institution, "A");
    }

    #[test]
    fn notices_follow_locale() {
        let mut s = session();
        let reason = s.add_selection("", "2019").unwrap_err();
        assert_eq!(s.notice(reason), "Please select both a year and an institution");
        assert!(s.set_locale("fr"));
        assert_eq!(s.notice(reason), "Veuillez choisir une année et un établissement");
    }
}
