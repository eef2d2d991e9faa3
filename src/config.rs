use anyhow::Context;
use serde::{de::Visitor, Deserialize};
use std::{
    ops::Deref,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

#[derive(Deserialize, Debug)]
pub struct DbConfig {
    #[serde(default = "default_db_file")]
    pub file: PathBuf,
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Deserialize, Debug)]
pub struct NetConfig {
    #[serde(default = "default_static_dir")]
    pub static_dir: ValidPath,
    #[serde(default = "default_template_dir")]
    pub template_dir: ValidPath,
    #[serde(default = "default_base_url")]
    pub base_url: Url,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_db")]
    pub db: DbConfig,
    #[serde(default = "default_net")]
    pub net: NetConfig,
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let text = match path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("could not read config file {}", path.display()))?,
            None => String::new(),
        };

        Self::parse(&text)
    }

    fn parse(text: &str) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(text).context("invalid config file")?;
        config.net.check()?;
        Ok(config)
    }
}

impl DbConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl NetConfig {
    // defaults skip the visitor, so every directory is checked again here
    fn check(&mut self) -> anyhow::Result<()> {
        self.static_dir = ValidPath::new(&*self.static_dir)
            .with_context(|| format!("static dir {} does not exist", self.static_dir.display()))?;
        self.template_dir = ValidPath::new(&*self.template_dir).with_context(|| {
            format!("template dir {} does not exist", self.template_dir.display())
        })?;
        Ok(())
    }
}

pub fn port_from_env() -> anyhow::Result<u16> {
    let port = std::env::var("PORT").context("PORT is not set")?;
    port.parse()
        .with_context(|| format!("PORT is not a valid port number: {:?}", port))
}

fn default_db_file() -> PathBuf {
    PathBuf::from("publish.db")
}

fn default_open_timeout_ms() -> u64 {
    1000
}

fn default_busy_timeout_ms() -> u64 {
    30_000
}

fn default_static_dir() -> ValidPath {
    ValidPath(PathBuf::from("static"))
}

fn default_template_dir() -> ValidPath {
    ValidPath(PathBuf::from("templates"))
}

fn default_base_url() -> Url {
    Url::parse("http://localhost/").expect("literal url")
}

fn default_db() -> DbConfig {
    DbConfig {
        file: default_db_file(),
        open_timeout_ms: default_open_timeout_ms(),
        busy_timeout_ms: default_busy_timeout_ms(),
    }
}

fn default_net() -> NetConfig {
    NetConfig {
        static_dir: default_static_dir(),
        template_dir: default_template_dir(),
        base_url: default_base_url(),
    }
}

#[derive(Debug)]
pub struct ValidPath(PathBuf);

impl ValidPath {
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(ValidPath(path.as_ref().canonicalize()?))
    }
}

impl<'de> Deserialize<'de> for ValidPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ValidPathVisitor;
        impl Visitor<'_> for ValidPathVisitor {
            type Value = ValidPath;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "an existing path")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                ValidPath::new(v).map_err(|err| E::custom(format!("{}: {}", v, err)))
            }
        }

        deserializer.deserialize_str(ValidPathVisitor)
    }
}

impl Deref for ValidPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.0.as_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_manifest_dir(dir: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join(dir)
            .canonicalize()
            .unwrap()
    }

    #[test]
    fn empty_file_gives_defaults() {
        // cargo runs tests from the manifest dir, where static/ and templates/ live
        let config = Config::parse("").unwrap();
        assert_eq!(config.db.file, PathBuf::from("publish.db"));
        assert_eq!(config.db.open_timeout(), Duration::from_secs(1));
        assert_eq!(config.db.busy_timeout(), Duration::from_secs(30));
        assert_eq!(config.net.base_url.as_str(), "http://localhost/");
    }

    #[test]
    fn default_dirs_are_checked() {
        let config = Config::parse("").unwrap();
        assert!(config.net.static_dir.is_absolute());
        assert_eq!(&*config.net.static_dir, in_manifest_dir("static"));
        assert_eq!(&*config.net.template_dir, in_manifest_dir("templates"));
    }

    #[test]
    fn missing_default_dir_is_rejected() {
        let mut net = default_net();
        net.template_dir = ValidPath(PathBuf::from("no-such-templates"));

        let err = net.check().unwrap_err();
        assert!(err.to_string().contains("no-such-templates"));
    }

    #[test]
    fn sections_override_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let text = format!(
            "[db]\nfile = \"pages.db\"\nopen_timeout_ms = 250\nbusy_timeout_ms = 5000\n\n\
             [net]\nstatic_dir = {:?}\ntemplate_dir = {:?}\nbase_url = \"https://publish.li/\"\n",
            dir.path().display().to_string(),
            dir.path().display().to_string(),
        );

        let config = Config::parse(&text).unwrap();
        assert_eq!(config.db.file, PathBuf::from("pages.db"));
        assert_eq!(config.db.open_timeout(), Duration::from_millis(250));
        assert_eq!(config.db.busy_timeout(), Duration::from_secs(5));
        assert_eq!(&*config.net.static_dir, dir.path().canonicalize().unwrap());
        assert_eq!(config.net.base_url.as_str(), "https://publish.li/");
    }

    #[test]
    fn missing_static_dir_is_rejected() {
        let text = "[net]\nstatic_dir = \"/definitely/not/here\"\n";
        assert!(Config::parse(text).is_err());
    }
}
