pub mod parse_osm;
pub mod waterbodies;

use std::{fs::{self, create_dir_all}, path::{Path, PathBuf}};
use log::{info, error};

use crate::{
    config::UserConfig,
    errors::{Error, Result},
};

use self::{parse_osm::ParseOsmEtl, waterbodies::WaterbodiesEtl};


pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn is_cached(&self, dir: &Path) -> Result<bool>;
    fn clean(&self, dir: &Path) -> Result<()>;

    fn extract(&mut self, dir: &Path) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()>;

    fn process(&mut self, dir: &Path) -> Result<()> {
        info!(etl_name = self.etl_name(); "Starting ETL process");
        if self.is_cached(dir)? {
            info!(etl_name = self.etl_name(); "Using cached value");
        } else {
            info!(etl_name = self.etl_name(); "Extracting");
            let input = match self.extract(dir) {
                Ok(input) => Ok(input),
                Err(err) => {
                    error!(etl_name = self.etl_name(), err = err.message.as_str(); "Extraction failed with error");
                    Err(err)
                },
            }?;

            info!(etl_name = self.etl_name(); "Transforming");
            let output = match self.transform(input) {
                Ok(output) => Ok(output),
                Err(err) => {
                    error!(etl_name = self.etl_name(), err = err.message.as_str(); "Transformation failed with error");
                    Err(err)
                },
            }?;

            info!(etl_name = self.etl_name(); "Loading");
            match self.load(dir, output) {
                Ok(_) => Ok(()),
                Err(err) => {
                    error!(etl_name = self.etl_name(), err = err.message.as_str(); "Loading failed with error");
                    Err(err)
                },
            }?;
        }
        info!(etl_name = self.etl_name(); "Process finished");
        Ok(())
    }
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    if path.try_exists()? {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Each input document gets its own directory below `dest_path`, holding the parse cache
/// and both feature outputs.
pub fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let input_fname = Path::new(&config.data_path)
        .file_name()
        .ok_or_else(|| Error::config("Could not get input file name"))?;
    let output_dir = Path::new(&config.dest_path).join(input_fname);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

/// Parses the input document and writes the waterbody outputs into `dir`. With `force`,
/// cached stage outputs are removed first so every stage runs again.
pub fn run_pipeline(config: &UserConfig, dir: &Path, force: bool) -> Result<()> {
    let mut parse_etl = ParseOsmEtl::new(config);
    let mut waterbodies_etl = WaterbodiesEtl::new(config);

    if force {
        parse_etl.clean(dir)?;
        waterbodies_etl.clean(dir)?;
    }

    parse_etl.process(dir)?;
    waterbodies_etl.process(dir)?;
    Ok(())
}
