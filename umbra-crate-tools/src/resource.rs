use std::path::{Path, PathBuf};

/// 工作区内的固定目录，全部以本 crate 的上一级目录为根
///
/// ```ignore
/// UmbraPath::resources_path("sky.hdr");          // <root>/resources/sky.hdr
/// UmbraPath::shader_src_path("geometry.hlsl");   // <root>/engine/shader/src/geometry.hlsl
/// ```
pub struct UmbraPath;
impl UmbraPath {
    pub fn workspace_path() -> PathBuf {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.parent().map_or_else(|| manifest_dir.to_path_buf(), Path::to_path_buf)
    }

    /// 缺失时使用默认配置
    pub fn config_path() -> PathBuf {
        Self::workspace_path().join("umbra.toml")
    }

    pub fn resources_path(file: &str) -> PathBuf {
        Self::workspace_path().join("resources").join(file)
    }

    pub fn shader_root_path() -> PathBuf {
        Self::workspace_path().join("engine").join("shader")
    }

    /// HLSL 源文件
    pub fn shader_src_path(file: &str) -> PathBuf {
        Self::shader_root_path().join("src").join(file)
    }

    /// 编译出的 SPIR-V
    pub fn shader_build_path(file: &str) -> PathBuf {
        Self::shader_root_path().join(".build").join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_paths_live_under_engine() {
        let src = UmbraPath::shader_src_path("shadow.hlsl");
        assert!(src.ends_with("engine/shader/src/shadow.hlsl"));

        let spv = UmbraPath::shader_build_path("shadow.vs.spv");
        assert!(spv.ends_with("engine/shader/.build/shadow.vs.spv"));
        assert!(spv.starts_with(UmbraPath::workspace_path()));
    }

    #[test]
    fn config_sits_at_workspace_root() {
        assert_eq!(UmbraPath::config_path().parent(), Some(UmbraPath::workspace_path().as_path()));
    }
}
