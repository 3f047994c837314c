// src/config.rs
use crate::dates::DateOrder;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Env var consulted when no explicit config path is given.
pub const CONFIG_ENV: &str = "CRMDASH_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Telecaller,
    SalesCoordinator,
    Salesman,
    Crm,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Telecaller => "Telecaller",
            Role::SalesCoordinator => "Sales Coordinator",
            Role::Salesman => "Salesman",
            Role::Crm => "CRM",
        })
    }
}

impl Role {
    /// Accepts the config spelling (`salesCoordinator`) and the display one.
    pub fn parse(s: &str) -> Option<Role> {
        let squashed: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match squashed.as_str() {
            "telecaller" => Some(Role::Telecaller),
            "salescoordinator" => Some(Role::SalesCoordinator),
            "salesman" => Some(Role::Salesman),
            "crm" => Some(Role::Crm),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    /// Stable lowercase key, also used for sample data (`calls/<key>`).
    pub key: String,
    pub name: String,
    pub phone_number: String,
    pub call_log_sheet: String,
    #[serde(default)]
    pub recordings_folder: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSource {
    pub url: String,
    #[serde(default)]
    pub date_order: DateOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sources {
    #[serde(default = "default_leads_sheet")]
    pub leads: SheetSource,
    #[serde(default = "default_visits_sheet")]
    pub visits: SheetSource,
    #[serde(default = "default_deals_sheet")]
    pub deals: SheetSource,
    #[serde(default = "default_targets_sheet")]
    pub targets: SheetSource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_staff")]
    pub staff: Vec<StaffMember>,
    #[serde(default = "default_sources")]
    pub sources: Sources,
    #[serde(default = "default_true")]
    pub sample_fallback: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
    #[serde(default = "default_revenue_target")]
    pub revenue_target: f64,
    #[serde(default = "default_recent_lead_days")]
    pub recent_lead_days: u32,
    #[serde(default = "default_recent_lead_limit")]
    pub recent_lead_limit: usize,
    #[serde(default)]
    pub call_log_date_order: DateOrder,
}

const SHEETS: &str = "https://docs.google.com/spreadsheets/d/e";
const LEADS_SHEET: &str = "2PACX-1vQL2FFpsyRDa6Sv2rj8qjIlYBkxcXDJbV4nwdLxxIeegJj9KG8XTZdwAD7C4gr56uJhCvada8qoj-x7";
const VISITS_SHEET: &str = "2PACX-1vQzL_R75V1wX-XnGwzoU6h627ErY-tFuCSP3OBclfee2FuZXYEt1TbI37goL_1_ez4Dzt6Wc2M0gMh9";
const DEALS_SHEET: &str = "2PACX-1vS4g4GWB2Je79PFouIJycDPOFn47CjIrN4yqT9IJZ2hJWdhLR-mzO25u3bn6qh0PcVG5UJLfAB411UI";

fn published(sheet: &str) -> String {
    format!("{}/{}/pub?output=csv", SHEETS, sheet)
}

fn default_leads_sheet() -> SheetSource {
    SheetSource {
        url: published(LEADS_SHEET),
        date_order: DateOrder::DayFirst,
    }
}

fn default_visits_sheet() -> SheetSource {
    SheetSource {
        url: published(VISITS_SHEET),
        date_order: DateOrder::DayFirst,
    }
}

fn default_deals_sheet() -> SheetSource {
    SheetSource {
        url: published(DEALS_SHEET),
        date_order: DateOrder::MonthFirst,
    }
}

fn default_targets_sheet() -> SheetSource {
    SheetSource {
        url: format!("{}/{}/pub?gid=1&output=csv", SHEETS, DEALS_SHEET),
        date_order: DateOrder::MonthFirst,
    }
}

fn default_sources() -> Sources {
    Sources {
        leads: default_leads_sheet(),
        visits: default_visits_sheet(),
        deals: default_deals_sheet(),
        targets: default_targets_sheet(),
    }
}

fn staff(
    key: &str,
    name: &str,
    phone: &str,
    sheet: &str,
    folder: &str,
    role: Role,
) -> StaffMember {
    StaffMember {
        key: key.to_string(),
        name: name.to_string(),
        phone_number: phone.to_string(),
        call_log_sheet: sheet.to_string(),
        recordings_folder: format!("https://drive.google.com/drive/folders/{}", folder),
        role,
    }
}

fn default_staff() -> Vec<StaffMember> {
    use Role::*;
    vec![
        staff(
            "simran",
            "Simran",
            "8556896739",
            &published("2PACX-1vTmt55C-IwM1wBt0Yr6WaOuaEK9GqrsZfzTXJnv0X8iA2PSOx6-YIAMZ4RHGkQ0ofozQB_jk3ezvfsg"),
            "1gHXfzx_WzfbKqncHiXDnLiojYw8tVqrN",
            Telecaller,
        ),
        staff(
            "raman",
            "Raman",
            "9876543210",
            &published("2PACX-1vQcQdwDgi53G6fKGYYspy5H6ixwiL0ofXdfvfODaUvkg-QfisHMAOgnrsxzIcvJjSM60iu7pvH3iO44"),
            "1yYOvaPvquMfeemHCf5iDz4QDUXQNpKwf",
            Telecaller,
        ),
        staff(
            "rupali",
            "Rupali",
            "9876543211",
            &published("2PACX-1vQjPznndiMvibis4pMsKUWDOJz80y_BRtlADpJTSR6ZFa33wl1rLoFgvtVLt-ZvceUmyJAMVpkW_yJM"),
            "1GWJnN6zqQ3k7TsDPOPXyLWhyLnkO0h-9",
            Telecaller,
        ),
        staff(
            "gagan",
            "Gagan",
            "9876543212",
            &published("2PACX-1vRaiohGFPfF4tYhjDRqgRLbnhaXdWdt27bbAIArm3zm98ItVMVElkTj6xqcuCWfB1CqnyuR5DQA_MwG"),
            "12-V9csAjHl9597ywBNGXDl-0fN6uNlgr",
            SalesCoordinator,
        ),
        staff(
            "aman",
            "Aman",
            "9876543213",
            &published("2PACX-1vRxxlCwcIVmvzhmCfoCjrbPmApoPP_MCPCo3J-nRvbPHtbAXI8Jf_NkCWYgd-fIP8gs4ZaFp0cK8cv0"),
            "14T-_xLaEcb5ww6wHV53Mds8QZ0aJpPv7",
            SalesCoordinator,
        ),
        staff(
            "arsh",
            "Arsh",
            "9876543214",
            &published("2PACX-1vRjwHOTpRN3iOmwidF7J8jm8I9mJYxdfDo5YIT8fYHfaJTpMrTpVfK1h6T5sfou1cZzD2NluZqVGvW3"),
            "1oDFEG37FVPuli0pBYSVPZDLigMyn5Qba",
            SalesCoordinator,
        ),
        staff(
            "arun",
            "Arun",
            "9876543215",
            &published("2PACX-1vTJPcfkQFPrBLoLg8LJs6kRFl8wDlDimEZgGs0xz-ZkHF8w5__XK5NFx1LgHkOGkASvXXn5FVzWczY3"),
            "1Kv7zzqbitm5gFXwZwPl8aSac1tzNTV4q",
            Salesman,
        ),
        staff(
            "jaskaran",
            "Jaskaran",
            "9876543216",
            &published("2PACX-1vTRzCqhQnHsZbGVZpgEYvfl5sBk5ssLCYPaKTA3ttj21JaSA0vjoYKX2UfrKgHQXSjX6yr3cT6XRi45"),
            "1gigGq0px0SxgVpu2C17YaNp29sTUaHs-",
            Salesman,
        ),
        // no published log yet; always served from sample data
        staff(
            "daljeet",
            "Daljeet",
            "9876543217",
            "https://docs.google.com/spreadsheets/d/daljeet-call-logs-sheet-id/edit",
            "daljeet-recordings-folder-id",
            Crm,
        ),
    ]
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_window_days() -> u32 {
    7
}

fn default_revenue_target() -> f64 {
    120_000_000.0
}

fn default_recent_lead_days() -> u32 {
    7
}

fn default_recent_lead_limit() -> usize {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            staff: default_staff(),
            sources: default_sources(),
            sample_fallback: default_true(),
            request_timeout_secs: default_request_timeout_secs(),
            default_window_days: default_window_days(),
            revenue_target: default_revenue_target(),
            recent_lead_days: default_recent_lead_days(),
            recent_lead_limit: default_recent_lead_limit(),
            call_log_date_order: DateOrder::MonthFirst,
        }
    }
}

impl Settings {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let settings: Settings = if text.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(text)?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Explicit path, else `$CRMDASH_CONFIG`, else built-in defaults.
    #[tracing::instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match resolved {
            Some(p) => {
                let text = std::fs::read_to_string(&p)?;
                let settings = Self::from_yaml_str(&text)?;
                info!(path = %p.display(), staff = settings.staff.len(), "loaded settings");
                Ok(settings)
            }
            None => {
                debug!("no config file; using defaults");
                Ok(Settings::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for member in &self.staff {
            if member.key.trim().is_empty() || member.name.trim().is_empty() {
                return Err(Error::Config("staff entries need a key and a name".into()));
            }
            if !seen.insert(member.key.as_str()) {
                return Err(Error::Config(format!("duplicate staff key `{}`", member.key)));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Staff display names in directory order; seeds per-agent breakdowns.
    pub fn known_agents(&self) -> Vec<String> {
        self.staff.iter().map(|s| s.name.clone()).collect()
    }

    pub fn staff_member(&self, key_or_name: &str) -> Option<&StaffMember> {
        self.staff
            .iter()
            .find(|s| s.key == key_or_name || s.name.eq_ignore_ascii_case(key_or_name))
    }

    /// Published sheet URL → static sample key, for the fallback source.
    pub fn fallback_routes(&self) -> HashMap<String, String> {
        let mut routes: HashMap<String, String> = self
            .staff
            .iter()
            .map(|s| (s.call_log_sheet.clone(), format!("calls/{}", s.key)))
            .collect();
        routes.insert(self.sources.leads.url.clone(), "leads".into());
        routes.insert(self.sources.visits.url.clone(), "visits".into());
        routes.insert(self.sources.deals.url.clone(), "deals".into());
        routes.insert(self.sources.targets.url.clone(), "targets".into());
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_carry_the_staff_directory() {
        let s = Settings::default();
        assert_eq!(s.staff.len(), 9);
        assert_eq!(s.staff[0].name, "Simran");
        assert_eq!(s.staff[0].phone_number, "8556896739");
        assert_eq!(s.staff[8].role, Role::Crm);
        assert_eq!(s.revenue_target, 120_000_000.0);
        assert!(s.sample_fallback);
        assert!(s.sources.targets.url.contains("gid=1"));
        assert_eq!(s.sources.leads.date_order, DateOrder::DayFirst);
        assert_eq!(&s.known_agents()[..3], &["Simran", "Raman", "Rupali"]);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() -> Result<()> {
        let s = Settings::from_yaml_str(
            r#"
sample_fallback: false
request_timeout_secs: 5
staff:
  - key: neha
    name: Neha
    phone_number: "9000000001"
    call_log_sheet: http://127.0.0.1:9/neha.csv
    role: salesCoordinator
sources:
  deals:
    url: http://127.0.0.1:9/deals.csv
    date_order: dayFirst
"#,
        )?;
        assert!(!s.sample_fallback);
        assert_eq!(s.request_timeout_secs, 5);
        assert_eq!(s.staff.len(), 1);
        assert_eq!(s.staff[0].role, Role::SalesCoordinator);
        assert_eq!(s.staff[0].recordings_folder, "");
        assert_eq!(s.sources.deals.date_order, DateOrder::DayFirst);
        assert_eq!(s.sources.leads, default_leads_sheet());
        assert_eq!(s.default_window_days, 7);
        Ok(())
    }

    #[test]
    fn rejects_duplicate_staff_keys() {
        let yaml = r#"
staff:
  - { key: a, name: A, phone_number: "1", call_log_sheet: x, role: telecaller }
  - { key: a, name: B, phone_number: "2", call_log_sheet: y, role: salesman }
"#;
        assert!(matches!(
            Settings::from_yaml_str(yaml),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn loads_from_explicit_path() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "recent_lead_limit: 3\nrevenue_target: 5000")?;
        let s = Settings::load(Some(file.path()))?;
        assert_eq!(s.recent_lead_limit, 3);
        assert_eq!(s.revenue_target, 5000.0);
        assert_eq!(s.staff.len(), 9);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Settings::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn fallback_routes_cover_every_sheet() {
        let s = Settings::default();
        let routes = s.fallback_routes();
        assert_eq!(routes.get(&s.staff[1].call_log_sheet).map(String::as_str), Some("calls/raman"));
        assert_eq!(routes.get(&s.sources.targets.url).map(String::as_str), Some("targets"));
        assert_eq!(routes.len(), 13);
    }

    #[test]
    fn role_parsing_accepts_both_spellings() {
        assert_eq!(Role::parse("salesCoordinator"), Some(Role::SalesCoordinator));
        assert_eq!(Role::parse("Sales Coordinator"), Some(Role::SalesCoordinator));
        assert_eq!(Role::parse("CRM"), Some(Role::Crm));
        assert_eq!(Role::parse("manager"), None);
    }
}
