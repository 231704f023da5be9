use crate::error::Result;
use crate::settings::{get_data_dir, load_settings, save_settings, shellexpand_path};
use crate::store::Store;

pub fn run(data_dir: Option<String>) -> Result<()> {
    if let Some(dir) = data_dir {
        let mut settings = load_settings();
        settings.data_dir = shellexpand_path(&dir);
        save_settings(&settings)?;
    }

    let resolved = get_data_dir();
    let store = Store::open(&resolved)?;
    std::fs::create_dir_all(store.dir().exports())?;
    std::fs::create_dir_all(store.dir().backups())?;

    println!("Initialized tally at {}", resolved.display());
    Ok(())
}
