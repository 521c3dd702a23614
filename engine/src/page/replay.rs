// Replays a recorded page script against a MemoryPage.
//
// Script header: offset_secs;energy;balance;button
// Example row:   120;8.500;1,234.5678;Stop mining
//
// An empty cell leaves the element unchanged, a single '-' removes it from the page.
// `balance` and `button` columns are optional.
use super::memory::MemoryPage;
use super::MutationKind;
use crate::error::EngineError;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellUpdate {
    Keep,
    Remove,
    Set(String),
}

impl CellUpdate {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => CellUpdate::Keep,
            Some("-") => CellUpdate::Remove,
            Some(text) => CellUpdate::Set(text.to_string()),
        }
    }

    fn apply(&self, set: impl FnOnce(Option<&str>)) {
        match self {
            CellUpdate::Keep => {}
            CellUpdate::Remove => set(None),
            CellUpdate::Set(text) => set(Some(text.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    pub offset: Duration,
    pub energy: CellUpdate,
    pub balance: CellUpdate,
    pub button: CellUpdate,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayScript {
    steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EngineError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let offset_col = Self::column(&headers, "offset_secs").ok_or_else(|| {
            EngineError::ReplayFormatError("missing 'offset_secs' column".to_string())
        })?;
        let energy_col = Self::column(&headers, "energy").ok_or_else(|| {
            EngineError::ReplayFormatError("missing 'energy' column".to_string())
        })?;
        let balance_col = Self::column(&headers, "balance");
        let button_col = Self::column(&headers, "button");

        let mut steps: Vec<ReplayStep> = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let line = idx + 2;
            let record = result?;

            let offset_str = record.get(offset_col).map(str::trim).unwrap_or_default();
            let offset_secs: f64 = offset_str.parse().map_err(|e| {
                EngineError::ReplayFormatError(format!(
                    "invalid offset_secs '{}' at line {}: {}",
                    offset_str, line, e
                ))
            })?;
            if !offset_secs.is_finite() || offset_secs < 0.0 {
                return Err(EngineError::ReplayFormatError(format!(
                    "offset_secs must be a non-negative number at line {}",
                    line
                )));
            }
            let offset = Duration::try_from_secs_f64(offset_secs).map_err(|e| {
                EngineError::ReplayFormatError(format!(
                    "invalid offset_secs '{}' at line {}: {}",
                    offset_str, line, e
                ))
            })?;
            if steps.last().is_some_and(|prev| prev.offset > offset) {
                return Err(EngineError::ReplayFormatError(format!(
                    "offset_secs goes backwards at line {}",
                    line
                )));
            }

            steps.push(ReplayStep {
                offset,
                energy: CellUpdate::parse(record.get(energy_col)),
                balance: CellUpdate::parse(balance_col.and_then(|c| record.get(c))),
                button: CellUpdate::parse(button_col.and_then(|c| record.get(c))),
            });
        }

        Ok(ReplayScript { steps })
    }

    fn column(headers: &StringRecord, name: &str) -> Option<usize> {
        headers.iter().position(|header| header.trim() == name)
    }

    pub fn steps(&self) -> &[ReplayStep] {
        &self.steps
    }

    pub fn duration(&self) -> Duration {
        self.steps.last().map(|s| s.offset).unwrap_or_default()
    }

    /// Applies one step to the page and fires the notification the game would.
    pub fn apply(step: &ReplayStep, page: &MemoryPage) -> usize {
        step.energy.apply(|text| page.set_energy_text(text));
        step.balance.apply(|text| page.set_balance_text(text));
        step.button.apply(|text| page.set_button_label(text));
        page.notify(&[MutationKind::CharacterData, MutationKind::ChildList])
    }

    /// Plays every step at its offset, compressed by `speed` (2.0 plays twice as fast).
    /// Fails before touching the page if a step's deadline cannot be scheduled.
    pub async fn play(&self, page: &MemoryPage, speed: f64) -> Result<usize, EngineError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(EngineError::ConfigError(format!(
                "replay speed must be a positive number, got {}",
                speed
            )));
        }
        let started = tokio::time::Instant::now();
        let deadlines = self
            .steps
            .iter()
            .map(|step| {
                Duration::try_from_secs_f64(step.offset.as_secs_f64() / speed)
                    .ok()
                    .and_then(|delay| started.checked_add(delay))
                    .ok_or_else(|| {
                        EngineError::ConfigError(format!(
                            "replay speed {} puts offset {:.3}s out of range",
                            speed,
                            step.offset.as_secs_f64()
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (i, (step, deadline)) in self.steps.iter().zip(deadlines).enumerate() {
            tokio::time::sleep_until(deadline).await;
            let delivered = Self::apply(step, page);
            tracing::debug!(
                step = i,
                offset_secs = step.offset.as_secs_f64(),
                delivered,
                "Replayed page step"
            );
        }
        Ok(self.steps.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageAdapter;
    use shared::models::AffordanceLabels;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_script_valid() {
        let tmp = create_test_csv(
            "\
offset_secs;energy;balance;button
0;9.000;100.5;Start mining
60;4.500;;
120.5;-;110,000.25;-",
        );
        let script = ReplayScript::from_path(tmp.path()).unwrap();
        let steps = script.steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].energy, CellUpdate::Set("9.000".to_string()));
        assert_eq!(steps[0].button, CellUpdate::Set("Start mining".to_string()));
        assert_eq!(steps[1].balance, CellUpdate::Keep);
        assert_eq!(steps[2].energy, CellUpdate::Remove);
        assert_eq!(steps[2].offset, Duration::from_millis(120_500));
        assert_eq!(script.duration(), Duration::from_millis(120_500));
    }

    #[test]
    fn test_load_script_energy_only() {
        let script =
            ReplayScript::from_reader("offset_secs;energy\n0;100\n1;200\n".as_bytes()).unwrap();
        assert_eq!(script.steps().len(), 2);
        assert_eq!(script.steps()[1].button, CellUpdate::Keep);
    }

    #[test]
    fn test_load_script_missing_column() {
        let result = ReplayScript::from_reader("offset_secs;balance\n0;1\n".as_bytes());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("missing 'energy' column"));
    }

    #[test]
    fn test_load_script_bad_offset() {
        let result = ReplayScript::from_reader("offset_secs;energy\nsoon;1\n".as_bytes());
        assert!(result.unwrap_err().to_string().contains("invalid offset_secs 'soon' at line 2"));

        let result = ReplayScript::from_reader("offset_secs;energy\n10;1\n5;2\n".as_bytes());
        assert!(result.unwrap_err().to_string().contains("goes backwards at line 3"));
    }

    #[test]
    fn test_load_script_offset_too_large() {
        let result = ReplayScript::from_reader("offset_secs;energy\n0;1\n1e30;2\n".as_bytes());
        let err = result.unwrap_err();
        assert!(matches!(err, EngineError::ReplayFormatError(_)));
        assert!(err.to_string().contains("invalid offset_secs '1e30' at line 3"));
    }

    #[test]
    fn test_load_script_file_not_found() {
        let result = ReplayScript::from_path("non_existent_script.csv");
        assert!(matches!(result, Err(EngineError::IoError { .. })));
    }

    #[test]
    fn test_apply_step_updates_page() {
        let page = MemoryPage::new(AffordanceLabels::default());
        let script = ReplayScript::from_reader(
            "offset_secs;energy;balance;button\n0;9.000;12.5;Stop mining\n1;-;;\n".as_bytes(),
        )
        .unwrap();

        ReplayScript::apply(&script.steps()[0], &page);
        assert_eq!(page.read_energy(), Some(9000));
        assert_eq!(page.read_balance(), Some(12.5));
        assert!(page.read_action_affordance().unwrap().is_stop);

        ReplayScript::apply(&script.steps()[1], &page);
        assert_eq!(page.read_energy(), None);
        assert_eq!(page.read_balance(), Some(12.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_honours_offsets() {
        let page = MemoryPage::new(AffordanceLabels::default());
        let script =
            ReplayScript::from_reader("offset_secs;energy\n0;1\n600;2\n".as_bytes()).unwrap();
        let started = tokio::time::Instant::now();
        let played = script.play(&page, 10.0).await.unwrap();
        assert_eq!(played, 2);
        assert_eq!(page.read_energy(), Some(2));
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_rejects_unschedulable_speed() {
        let page = MemoryPage::new(AffordanceLabels::default());
        let script =
            ReplayScript::from_reader("offset_secs;energy\n0;1\n600;2\n".as_bytes()).unwrap();

        let result = script.play(&page, 1e-300).await;
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
        assert!(result.unwrap_err().to_string().contains("out of range"));
        assert_eq!(page.read_energy(), None);

        for speed in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let result = script.play(&page, speed).await;
            assert!(matches!(result, Err(EngineError::ConfigError(_))));
        }
    }
}
