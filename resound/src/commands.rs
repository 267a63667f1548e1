use crate::builder::ProgressListener;
use crate::coordinator::SoundCacheCoordinator;

/// What a console command did, for the engine console to display.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Executed without output.
    Done,
    /// Executed with console output.
    Message(String),
    /// Bad arguments; the usage line for the console.
    Usage(&'static str),
    /// Not one of the sound cache commands.
    Unknown,
}

/// Dispatches one console command against the coordinator.
pub fn execute_command(
    coordinator: &SoundCacheCoordinator,
    command: &str,
    arguments: &[&str],
    listener: &dyn ProgressListener,
) -> CommandOutcome {
    match command {
        "snd_rebuildaudiocache" => match coordinator.rebuild_caches(true, listener) {
            Ok(report) => CommandOutcome::Message(format!(
                "rebuilt sound caches: {} shared, {} other, {} maps",
                report.shared_count, report.other_count, report.map_count
            )),
            Err(error) => CommandOutcome::Message(format!("sound cache rebuild failed: {error}")),
        },
        "snd_writemanifest" => match coordinator.write_manifest() {
            Ok(path) => CommandOutcome::Message(format!("wrote {}", path.display())),
            Err(error) => CommandOutcome::Message(format!("can't write manifest: {error}")),
        },
        "snd_async_minsize" => match arguments.first().and_then(|argument| argument.parse::<u32>().ok()) {
            Some(size) => {
                coordinator.set_async_minimum_size(size);
                CommandOutcome::Done
            }
            None => CommandOutcome::Usage("snd_async_minsize <bytes>"),
        },
        _ => CommandOutcome::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use resound_formats::test_support::counting_pcm_wave;

    use super::{CommandOutcome, execute_command};
    use crate::builder::SilentProgress;
    use crate::coordinator::{CoordinatorSettings, SoundCacheCoordinator};
    use crate::directory::DirectoryLoader;

    static DIRECTORY_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn game_fixture() -> (PathBuf, SoundCacheCoordinator) {
        let index = DIRECTORY_COUNTER.fetch_add(1, Ordering::Relaxed);
        let directory = std::env::temp_dir().join(format!("resound-commands-{}-{index}", std::process::id()));
        fs::create_dir_all(directory.join("sound")).unwrap();
        fs::create_dir_all(directory.join("maps")).unwrap();

        fs::write(directory.join("sound/a.wav"), counting_pcm_wave(22050, 100)).unwrap();
        fs::write(directory.join("maps/a.manifest"), "a.wav\n").unwrap();

        let loader = Arc::new(DirectoryLoader::new(&directory));
        let settings = CoordinatorSettings::for_game_directory(&directory);

        (directory, SoundCacheCoordinator::new(loader, settings))
    }

    #[test]
    fn async_minimum_size_is_settable() {
        let (_directory, coordinator) = game_fixture();

        let outcome = execute_command(&coordinator, "snd_async_minsize", &["1024"], &SilentProgress);
        assert_eq!(outcome, CommandOutcome::Done);
        assert_eq!(coordinator.async_minimum_size(), 1024);

        let outcome = execute_command(&coordinator, "snd_async_minsize", &["many"], &SilentProgress);
        assert_eq!(outcome, CommandOutcome::Usage("snd_async_minsize <bytes>"));

        let outcome = execute_command(&coordinator, "snd_async_minsize", &[], &SilentProgress);
        assert_eq!(outcome, CommandOutcome::Usage("snd_async_minsize <bytes>"));
    }

    #[test]
    fn rebuild_command_reports_the_partition() {
        let (directory, coordinator) = game_fixture();

        let outcome = execute_command(&coordinator, "snd_rebuildaudiocache", &[], &SilentProgress);
        assert_eq!(
            outcome,
            CommandOutcome::Message("rebuilt sound caches: 1 shared, 0 other, 1 maps".to_owned())
        );
        assert!(directory.join("sound/cache/_sharedprecache.cache").exists());
    }

    #[test]
    fn manifest_command_needs_an_active_level() {
        let (_directory, coordinator) = game_fixture();

        let outcome = execute_command(&coordinator, "snd_writemanifest", &[], &SilentProgress);
        assert!(matches!(outcome, CommandOutcome::Message(message) if message.contains("can't write manifest")));
    }

    #[test]
    fn unrelated_commands_fall_through() {
        let (_directory, coordinator) = game_fixture();

        assert_eq!(execute_command(&coordinator, "snd_restart", &[], &SilentProgress), CommandOutcome::Unknown);
    }
}
