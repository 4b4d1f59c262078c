use std::path::PathBuf;

lazy_static::lazy_static! {
    /// Path to the mintgate's data folder. Takes one of the following values
    /// in the corresponding priority order.
    ///
    /// - `$MINTGATE_DATA_FOLDER`.
    /// - `$XDG_DATA_HOME/mintgate`.
    /// - `$HOME/.local/share/mintgate`.
    /// - `<current directory>/mintgate`.
    pub static ref DATA_FOLDER: PathBuf = std::env::var("MINTGATE_DATA_FOLDER")
        .map(PathBuf::from)
        .or_else(|_| {
            std::env::var("XDG_DATA_HOME")
                .map(|path| PathBuf::from(path).join("mintgate"))
        })
        .or_else(|_| {
            std::env::var("HOME")
                .map(|path| {
                    PathBuf::from(path)
                        .join(".local")
                        .join("share")
                        .join("mintgate")
                })
        })
        .map_err(std::io::Error::other)
        .or_else(|_| {
            std::env::current_dir()
                .map(|path| path.join("mintgate"))
        })
        .expect("failed to choose the data folder path");

    /// Path to the mintgate database file: `DATA_FOLDER/mintgate.db`.
    pub static ref DATABASE_PATH: PathBuf = DATA_FOLDER.join("mintgate.db");

    /// Path to the mintgate config file: `DATA_FOLDER/config.json`.
    pub static ref CONFIG_PATH: PathBuf = DATA_FOLDER.join("config.json");

    /// Path to the local signer identities file: `DATA_FOLDER/identities.json`.
    pub static ref IDENTITIES_PATH: PathBuf = DATA_FOLDER.join("identities.json");
}
