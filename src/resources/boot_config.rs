//! Idempotent `key=value` upsert for firmware `config.txt`.
use anyhow::{Context as _, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use super::fs::{backup_once, replace_contents};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// Split a line into its key and whether it is commented out.
///
/// Matches `^\s*#?\s*key\s*=`; anything else (section headers such as
/// `[all]`, prose comments, blank lines) yields `None`.
fn line_key(line: &str) -> Option<(&str, bool)> {
    let rest = line.trim_start();
    let (rest, commented) = rest
        .strip_prefix('#')
        .map_or((rest, false), |r| (r.trim_start(), true));
    let (key, _) = rest.split_once('=')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, commented))
}

/// Whether `key` can be matched back by [`line_key`] once written.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains(['=', '#']) && !key.contains(char::is_whitespace)
}

/// Whether `value` fits on a single `config.txt` line.
#[must_use]
pub fn is_valid_value(value: &str) -> bool {
    !value.contains(['\n', '\r'])
}

/// Settings that survive a write/read cycle, first occurrence of a key wins.
fn usable(settings: &[(String, String)]) -> Vec<(&str, &str)> {
    let mut seen = HashSet::new();
    settings
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .filter(|&(k, v)| is_valid_key(k) && is_valid_value(v) && seen.insert(k))
        .collect()
}

/// Apply the desired settings and suppressions to `text`.
///
/// - The first line matching a desired key (commented or not) becomes the
///   canonical `key=value`; later matches are dropped; absent keys are
///   appended in the order given.
/// - Uncommented lines for a suppressed key get a leading `#`.  A key that
///   is both desired and suppressed stays desired.
/// - Settings whose key fails [`is_valid_key`] or whose value fails
///   [`is_valid_value`] are ignored.
/// - Every other line is kept verbatim.  The result ends with a newline
///   unless it is empty, and `patch(patch(x)) == patch(x)`.
///
/// # Examples
///
/// ```
/// use kiosk_cli::resources::boot_config::patch;
///
/// let settings = vec![("hdmi_force_hotplug".to_string(), "1".to_string())];
/// let suppress = vec!["hdmi_mode".to_string()];
/// let out = patch("#hdmi_force_hotplug=0\nhdmi_mode=16\n", &settings, &suppress);
/// assert_eq!(out, "hdmi_force_hotplug=1\n#hdmi_mode=16\n");
/// ```
#[must_use]
pub fn patch(text: &str, settings: &[(String, String)], suppress: &[String]) -> String {
    let settings = usable(settings);
    let desired: HashMap<&str, &str> = settings.iter().copied().collect();
    let suppressed: HashSet<&str> = suppress.iter().map(String::as_str).collect();
    let mut written: HashSet<&str> = HashSet::new();
    let mut out: Vec<String> = Vec::new();

    for line in text.lines() {
        match line_key(line) {
            Some((key, _)) if desired.contains_key(key) => {
                if let Some((&k, v)) = desired.get_key_value(key)
                    && written.insert(k)
                {
                    out.push(format!("{k}={v}"));
                }
            }
            Some((key, false)) if suppressed.contains(key) => out.push(format!("#{line}")),
            _ => out.push(line.to_string()),
        }
    }

    for &(key, value) in &settings {
        if written.insert(key) {
            out.push(format!("{key}={value}"));
        }
    }

    if out.is_empty() {
        return String::new();
    }
    let mut result = out.join("\n");
    result.push('\n');
    result
}

/// Describe what [`patch`] would change, one entry per key.
#[must_use]
pub fn pending_changes(
    text: &str,
    settings: &[(String, String)],
    suppress: &[String],
) -> Vec<String> {
    let settings = usable(settings);
    let mut changes = Vec::new();
    for &(key, value) in &settings {
        let canonical = format!("{key}={value}");
        let matching: Vec<&str> = text
            .lines()
            .filter(|l| line_key(l).is_some_and(|(k, _)| k == key))
            .collect();
        if matching.as_slice() != [canonical.as_str()] {
            changes.push(format!("set {canonical}"));
        }
    }
    let desired: HashSet<&str> = settings.iter().map(|&(k, _)| k).collect();
    for key in suppress {
        if desired.contains(key.as_str()) {
            continue;
        }
        if text
            .lines()
            .any(|l| line_key(l) == Some((key.as_str(), false)))
        {
            changes.push(format!("comment out {key}"));
        }
    }
    changes
}

/// Firmware `config.txt` with asserted and suppressed keys.
#[derive(Debug, Clone)]
pub struct BootConfigResource {
    /// Path to `config.txt`.
    pub path: PathBuf,
    /// Desired `(key, value)` pairs, in append order.
    pub settings: Vec<(String, String)>,
    /// Keys that must not appear uncommented.
    pub suppress: Vec<String>,
}

impl BootConfigResource {
    /// Create a new boot config resource.
    #[must_use]
    pub const fn new(
        path: PathBuf,
        settings: Vec<(String, String)>,
        suppress: Vec<String>,
    ) -> Self {
        Self {
            path,
            settings,
            suppress,
        }
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))
    }
}

impl Applicable for BootConfigResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let current = self.read()?;
        let patched = patch(&current, &self.settings, &self.suppress);
        if patched == current {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        backup_once(&self.path)?;
        replace_contents(&self.path, patched.as_bytes())?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for BootConfigResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.path.is_file() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} not found", self.path.display()),
            });
        }
        let current = self.read()?;
        if patch(&current, &self.settings, &self.suppress) == current {
            return Ok(ResourceState::Correct);
        }
        let pending = pending_changes(&current, &self.settings, &self.suppress);
        Ok(ResourceState::Incorrect {
            current: if pending.is_empty() {
                "formatting".to_string()
            } else {
                pending.join(", ")
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    const STOCK: &str = "\
# For more options and information see
# http://rptl.io/configtxt

#hdmi_force_hotplug=1
dtparam=audio=on
camera_auto_detect=1
hdmi_group=2
hdmi_mode=82
disable_overscan = 0

[cm4]
otg_mode=1

[all]
";

    #[test]
    fn line_key_variants() {
        assert_eq!(line_key("gpu_mem=128"), Some(("gpu_mem", false)));
        assert_eq!(line_key("  # gpu_mem = 128"), Some(("gpu_mem", true)));
        assert_eq!(line_key("#gpu_mem=128"), Some(("gpu_mem", true)));
        assert_eq!(line_key("[all]"), None);
        assert_eq!(line_key("# see http://rptl.io/configtxt"), None);
        assert_eq!(line_key(""), None);
        assert_eq!(line_key("=1"), None);
    }

    #[test]
    fn uncomments_and_replaces_existing_keys() {
        let s = settings(&[("hdmi_force_hotplug", "1"), ("disable_overscan", "1")]);
        let out = patch(STOCK, &s, &[]);
        assert!(out.contains("\nhdmi_force_hotplug=1\n"));
        assert!(!out.contains("#hdmi_force_hotplug"));
        assert!(out.contains("\ndisable_overscan=1\n"));
        assert!(!out.contains("disable_overscan = 0"));
    }

    #[test]
    fn appends_missing_keys_in_order() {
        let s = settings(&[("max_framebuffers", "2"), ("disable_splash", "1")]);
        let out = patch(STOCK, &s, &[]);
        assert!(out.ends_with("[all]\nmax_framebuffers=2\ndisable_splash=1\n"));
    }

    #[test]
    fn suppresses_uncommented_keys_only() {
        let text = "hdmi_mode=82\n#hdmi_group=2\n";
        let out = patch(text, &[], &keys(&["hdmi_mode", "hdmi_group"]));
        assert_eq!(out, "#hdmi_mode=82\n#hdmi_group=2\n");
    }

    #[test]
    fn duplicate_desired_keys_collapse_to_one() {
        let text = "gpu_mem=64\nfoo=bar\n#gpu_mem=256\ngpu_mem=32\n";
        let out = patch(text, &settings(&[("gpu_mem", "128")]), &[]);
        assert_eq!(out, "gpu_mem=128\nfoo=bar\n");
    }

    #[test]
    fn desired_wins_over_suppressed() {
        let text = "hdmi_mode=82\n";
        let out = patch(
            text,
            &settings(&[("hdmi_mode", "16")]),
            &keys(&["hdmi_mode"]),
        );
        assert_eq!(out, "hdmi_mode=16\n");
    }

    #[test]
    fn preserves_unrelated_lines_and_sections() {
        let out = patch(STOCK, &settings(&[("gpu_mem", "128")]), &[]);
        assert!(out.contains("dtparam=audio=on\n"));
        assert!(out.contains("[cm4]\notg_mode=1\n"));
        assert!(out.starts_with("# For more options and information see\n"));
    }

    #[test]
    fn adds_trailing_newline() {
        assert_eq!(patch("a=1", &[], &[]), "a=1\n");
        assert_eq!(patch("", &[], &[]), "");
    }

    #[test]
    fn patch_is_idempotent() {
        let s = settings(&[
            ("hdmi_force_hotplug", "1"),
            ("disable_overscan", "1"),
            ("max_framebuffers", "2"),
        ]);
        let sup = keys(&["hdmi_group", "hdmi_mode"]);
        let once = patch(STOCK, &s, &sup);
        let twice = patch(&once, &s, &sup);
        assert_eq!(once, twice);
    }

    #[test]
    fn unmatchable_keys_and_multiline_values_are_ignored() {
        let s = settings(&[
            ("dtparam=audio", "on"),
            ("bad key", "1"),
            ("#gpu_mem", "64"),
            ("disable_splash", "1\nhdmi_mode=4"),
            ("max_framebuffers", "2"),
        ]);
        let once = patch("[all]\n", &s, &[]);
        assert_eq!(once, "[all]\nmax_framebuffers=2\n");
        assert_eq!(patch(&once, &s, &[]), once);
        assert!(pending_changes(&once, &s, &[]).is_empty());
    }

    #[test]
    fn repeated_key_keeps_first_value() {
        let s = settings(&[("gpu_mem", "64"), ("gpu_mem", "128")]);
        let once = patch("", &s, &[]);
        assert_eq!(once, "gpu_mem=64\n");
        assert_eq!(patch(&once, &s, &[]), once);
    }

    #[test]
    fn key_and_value_checks() {
        assert!(is_valid_key("hdmi_mode"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("a=b"));
        assert!(!is_valid_key("a b"));
        assert!(!is_valid_key("#a"));
        assert!(is_valid_value("audio=on"));
        assert!(!is_valid_value("1\r"));
    }

    #[test]
    fn exactly_one_uncommented_line_per_key_after_patch() {
        let s = settings(&[("hdmi_force_hotplug", "1"), ("disable_overscan", "1")]);
        let sup = keys(&["hdmi_group", "hdmi_mode"]);
        let out = patch(STOCK, &s, &sup);
        for (key, value) in &s {
            let live: Vec<&str> = out
                .lines()
                .filter(|l| line_key(l) == Some((key.as_str(), false)))
                .collect();
            assert_eq!(live, vec![format!("{key}={value}").as_str()]);
        }
        for key in &sup {
            assert!(
                !out.lines()
                    .any(|l| line_key(l) == Some((key.as_str(), false))),
                "{key} should be commented out"
            );
        }
    }

    #[test]
    fn pending_changes_lists_drift() {
        let s = settings(&[("hdmi_force_hotplug", "1"), ("dtparam", "audio=on")]);
        let pending = pending_changes(STOCK, &s, &keys(&["hdmi_mode"]));
        assert_eq!(
            pending,
            vec![
                "set hdmi_force_hotplug=1".to_string(),
                "comment out hdmi_mode".to_string()
            ]
        );
    }

    #[test]
    fn resource_invalid_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let resource = BootConfigResource::new(dir.path().join("config.txt"), vec![], vec![]);
        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }

    #[test]
    fn resource_apply_patches_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        std::fs::write(&path, STOCK).unwrap();
        let resource = BootConfigResource::new(
            path.clone(),
            settings(&[("disable_splash", "1")]),
            keys(&["hdmi_mode"]),
        );

        assert!(matches!(
            resource.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(resource.apply().unwrap(), ResourceChange::AlreadyCorrect);

        let backup = dir.path().join("config.txt.kiosk-bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), STOCK);
    }
}
