use serde::Serialize;
use std::path::{Path, PathBuf};

/// Number of leading dot components of a dataset id that form its
/// directory path (`cmip5.output1.<inst>.<model>.<exp>.<freq>.<realm>.<table>.<ens>.<version>`).
const DATASET_ID_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    New,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRecord {
    pub status: RemoteStatus,
    pub file_id: String,
}

impl RemoteRecord {
    fn components(&self) -> Vec<&str> {
        self.file_id.split('.').collect()
    }

    /// Model component of the id, e.g. `MPI-ESM-LR`.
    pub fn model(&self) -> Option<&str> {
        self.file_id.split('.').nth(3)
    }

    /// The NetCDF file name the id ends with.
    pub fn file_name(&self) -> Option<String> {
        let parts = self.components();
        if parts.len() <= DATASET_ID_DEPTH {
            return None;
        }
        Some(parts[DATASET_ID_DEPTH..].join("."))
    }

    /// Local path under `data_root`: the dataset components as directories,
    /// then the variable directory, then the file.
    pub fn local_path(&self, data_root: &Path, variable: &str) -> Option<PathBuf> {
        let parts = self.components();
        let file_name = self.file_name()?;
        if parts[..DATASET_ID_DEPTH].iter().any(|p| p.is_empty()) {
            return None;
        }
        let mut path = data_root.to_path_buf();
        for part in &parts[..DATASET_ID_DEPTH] {
            path.push(part);
        }
        path.push(variable);
        path.push(file_name);
        Some(path)
    }
}

/// Parse `synda search -f` output: `<status> <size> <unit> <file-id>` per
/// line. Lines with another shape or status are ignored.
pub fn parse_search_output(raw: &str) -> Vec<RemoteRecord> {
    raw.lines()
        .filter_map(|line| {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() < 4 {
                return None;
            }
            let status = match fields[0] {
                "new" => RemoteStatus::New,
                "done" => RemoteStatus::Done,
                _ => return None,
            };
            Some(RemoteRecord {
                status,
                file_id: fields[3].to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
new   221.2 MB  cmip5.output1.MPI-M.MPI-ESM-LR.historical.mon.atmos.Amon.r1i1p1.v20120315.tro3_Amon_MPI-ESM-LR_historical_r1i1p1_195001-195912.nc
done  132.7 MB  cmip5.output1.MPI-M.MPI-ESM-LR.historical.mon.atmos.Amon.r1i1p1.v20120315.tro3_Amon_MPI-ESM-LR_historical_r1i1p1_200001-200512.nc
waiting 3 files
";

    #[test]
    fn parses_new_and_done_records() {
        let got = parse_search_output(SAMPLE);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].status, RemoteStatus::New);
        assert_eq!(got[1].status, RemoteStatus::Done);
        assert_eq!(got[1].model(), Some("MPI-ESM-LR"));
    }

    #[test]
    fn maps_ids_under_the_data_root() {
        let record = &parse_search_output(SAMPLE)[1];
        assert_eq!(
            record.file_name().as_deref(),
            Some("tro3_Amon_MPI-ESM-LR_historical_r1i1p1_200001-200512.nc")
        );
        let path = record
            .local_path(Path::new("/sdt/data"), "tro3")
            .expect("path");
        assert_eq!(
            path,
            PathBuf::from(
                "/sdt/data/cmip5/output1/MPI-M/MPI-ESM-LR/historical/mon/atmos/Amon/r1i1p1/v20120315/tro3/tro3_Amon_MPI-ESM-LR_historical_r1i1p1_200001-200512.nc"
            )
        );
    }

    #[test]
    fn short_ids_have_no_local_path() {
        let record = RemoteRecord {
            status: RemoteStatus::Done,
            file_id: "cmip5.output1.tas.nc".to_string(),
        };
        assert!(record.file_name().is_none());
        assert!(record.local_path(Path::new("/sdt/data"), "tas").is_none());
    }
}
