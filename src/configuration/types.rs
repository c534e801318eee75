use serde::Deserialize;
use std::path::PathBuf;

/// Settings for the console relay (`svncterm_server`) and its input pipe.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    pub width: u32,
    pub height: u32,
    pub timeout_secs: u64,
    pub pipe_path: PathBuf,
    pub server_bin: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            timeout_secs: 300,
            pipe_path: PathBuf::from("/tmp/svncterm_server_pipe"),
            server_bin: String::from("svncterm_server"),
        }
    }
}

/// Command lines used for every external step. Each entry may carry leading
/// arguments (e.g. `sudo mount`), which are kept in front of the call arguments.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub file: String,
    pub su_mkdir: String,
    pub mount: String,
    pub umount: String,
    pub losetup: String,
    pub findmnt: String,
    pub lsblk: String,
    pub qemu_nbd: String,
    pub rbd_nbd: String,
    pub lxc: String,
    pub pgrep: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            file: String::from("file -L"),
            su_mkdir: String::from("sudo mkdir -p"),
            mount: String::from("sudo mount"),
            umount: String::from("sudo umount"),
            losetup: String::from("sudo losetup"),
            findmnt: String::from("findmnt -n -o SOURCE"),
            lsblk: String::from("lsblk -nlpo NAME,FSTYPE"),
            qemu_nbd: String::from("sudo qemu-nbd"),
            rbd_nbd: String::from("sudo rbd-nbd"),
            lxc: String::from("lxc"),
            pgrep: String::from("pgrep -f"),
        }
    }
}
