pub mod deobfuscation_utils;
pub mod playlist_utils;
