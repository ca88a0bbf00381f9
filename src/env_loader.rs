use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(finder_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(home) = finder_home {
        return Some(home.join(".env"));
    }
    Some(home_dir?.join("datafinder/.env"))
}

/// Load `.env` from the working directory, else from the datafinder home.
/// Variables already set in the environment win.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("DATAFINDER_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}
