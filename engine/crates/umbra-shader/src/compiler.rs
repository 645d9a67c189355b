//! HLSL 着色器编译器
//!
//! 使用 dxc (来自 Vulkan SDK) 将 HLSL 着色器编译为 SPIR-V，产物写入 `engine/shader/.build/`。
//!
//! 编译器的任何输出（包括 warning）都会导致编译失败：`-WX` 让 dxc 自己把 warning 升级为 error，
//! 同时 stderr 上出现任何文本也视为失败。
//!
//! # 参考
//! - [Vulkan HLSL Guide](https://docs.vulkan.org/guide/latest/hlsl.html)

use std::path::{Path, PathBuf};

use ash::vk;
use itertools::Itertools;
use umbra_crate_tools::resource::UmbraPath;
use umbra_gfx::error::{GfxError, GfxResult};

/// Shader 的执行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderStage {
    Vertex,
    /// HLSL Pixel shader
    Pixel,
    Compute,
}
impl ShaderStage {
    /// dxc 的 shader model target
    pub fn target_profile(self) -> &'static str {
        match self {
            Self::Vertex => "vs_6_6",
            Self::Pixel => "ps_6_6",
            Self::Compute => "cs_6_6",
        }
    }

    pub fn vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            Self::Vertex => vk::ShaderStageFlags::VERTEX,
            Self::Pixel => vk::ShaderStageFlags::FRAGMENT,
            Self::Compute => vk::ShaderStageFlags::COMPUTE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vs",
            Self::Pixel => "ps",
            Self::Compute => "cs",
        }
    }
}

/// 一个 stage 的编译输入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub path: PathBuf,
    pub stage: ShaderStage,
    pub entry_point: String,
    /// `NAME` 或者 `NAME=VALUE`
    pub defines: Vec<String>,
}
impl ShaderSource {
    /// `file_name` 相对于 `engine/shader/src/`
    pub fn new(file_name: &str, stage: ShaderStage, entry_point: &str) -> Self {
        Self {
            path: UmbraPath::shader_src_path(file_name),
            stage,
            entry_point: entry_point.to_string(),
            defines: vec![],
        }
    }

    pub fn with_define(mut self, define: &str) -> Self {
        self.defines.push(define.to_string());
        self
    }

    /// 编译产物的文件名：`{stem}.{entry}.{profile}[.{defines}].spv`
    ///
    /// 同一个源文件用不同入口或宏编译时产物互不覆盖
    pub fn output_file_name(&self) -> String {
        let stem = self.path.file_stem().and_then(|s| s.to_str()).unwrap_or("shader");
        let mut name = format!("{stem}.{}.{}", self.entry_point, self.stage.target_profile());
        if !self.defines.is_empty() {
            let defines = self.defines.iter().map(|d| d.replace('=', "-")).join("_");
            name.push('.');
            name.push_str(&defines);
        }
        name.push_str(".spv");
        name
    }
}

/// 编译完成的 stage
#[derive(Debug, Clone)]
pub struct CompiledShader {
    pub source: ShaderSource,
    pub output_path: PathBuf,
    pub spirv: Vec<u8>,
}

/// dxc 的调用封装
#[derive(Debug, Clone)]
pub struct DxcCompiler {
    dxc_path: PathBuf,
    include_dir: PathBuf,
    output_dir: PathBuf,
}
impl Default for DxcCompiler {
    fn default() -> Self {
        Self::new("dxc")
    }
}
impl DxcCompiler {
    pub fn new(dxc_path: impl Into<PathBuf>) -> Self {
        Self {
            dxc_path: dxc_path.into(),
            include_dir: UmbraPath::shader_root_path().join("include"),
            output_dir: UmbraPath::shader_build_path(""),
        }
    }

    #[inline]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 完整的命令行参数
    pub fn command_args(&self, source: &ShaderSource, output_path: &Path) -> Vec<String> {
        let mut args = vec![
            "-spirv".to_string(),
            "-fspv-target-env=vulkan1.3".to_string(),
            "-T".to_string(),
            source.stage.target_profile().to_string(),
            "-E".to_string(),
            source.entry_point.clone(),
            "-WX".to_string(),
            "-O3".to_string(),
            "-I".to_string(),
            self.include_dir.to_string_lossy().into_owned(),
        ];
        for define in &source.defines {
            args.push("-D".to_string());
            args.push(define.clone());
        }
        args.push(source.path.to_string_lossy().into_owned());
        args.push("-Fo".to_string());
        args.push(output_path.to_string_lossy().into_owned());
        args
    }

    pub fn compile(&self, source: &ShaderSource) -> GfxResult<CompiledShader> {
        let _span = tracy_client::span!("DxcCompiler::compile");

        // 先确认源文件存在且可读，给出比 dxc 更明确的错误
        let text = std::fs::read_to_string(&source.path).map_err(|e| GfxError::FileIOFailure {
            path: source.path.clone(),
            source: e,
        })?;
        log::debug!("compiling {:?} ({} bytes) as {}", source.path, text.len(), source.stage.target_profile());

        std::fs::create_dir_all(&self.output_dir).map_err(|e| GfxError::FileIOFailure {
            path: self.output_dir.clone(),
            source: e,
        })?;
        let output_path = self.output_dir.join(source.output_file_name());

        let output = std::process::Command::new(&self.dxc_path)
            .args(self.command_args(source, &output_path))
            .output()
            .map_err(|e| GfxError::ShaderCompileFailure {
                file: source.path.clone(),
                diagnostics: format!("failed to launch {:?}: {e}", self.dxc_path),
            })?;
        check_compiler_output(&source.path, &output)?;

        let spirv = std::fs::read(&output_path).map_err(|e| GfxError::FileIOFailure {
            path: output_path.clone(),
            source: e,
        })?;
        log::info!("compiled {:?} -> {:?}", source.path, output_path.file_name().unwrap_or_default());

        Ok(CompiledShader {
            source: source.clone(),
            output_path,
            spirv,
        })
    }
}

/// 非 0 退出码或者 stderr 上有任何文本，都视为编译失败
fn check_compiler_output(file: &Path, output: &std::process::Output) -> GfxResult<()> {
    if !output.stdout.is_empty() {
        log::info!("stdout: {}", String::from_utf8_lossy(&output.stdout));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() && stderr.trim().is_empty() {
        return Ok(());
    }

    let diagnostics = if stderr.trim().is_empty() {
        format!("dxc exited with {}", output.status)
    } else {
        stderr.into_owned()
    };
    log::error!("{:?}:\n{}", file, diagnostics);
    Err(GfxError::ShaderCompileFailure {
        file: file.to_path_buf(),
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn output_with(code: i32, stderr: &str) -> std::process::Output {
        use std::os::unix::process::ExitStatusExt;
        std::process::Output {
            status: std::process::ExitStatus::from_raw(code << 8),
            stdout: vec![],
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn args_follow_dxc_conventions() {
        let compiler = DxcCompiler::new("dxc");
        let source = ShaderSource::new("blur.hlsl", ShaderStage::Compute, "main").with_define("V");
        let args = compiler.command_args(&source, Path::new("out.spv"));

        assert_eq!(&args[..2], &["-spirv", "-fspv-target-env=vulkan1.3"]);
        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-T") + 1], "cs_6_6");
        assert_eq!(args[pos("-E") + 1], "main");
        assert_eq!(args[pos("-D") + 1], "V");
        assert_eq!(args[pos("-Fo") + 1], "out.spv");
        assert!(args.contains(&"-WX".to_string()));
        assert!(args.contains(&"-O3".to_string()));
    }

    #[test]
    fn output_names_do_not_collide() {
        let h = ShaderSource::new("blur.hlsl", ShaderStage::Compute, "main");
        let v = h.clone().with_define("V");
        let ao = ShaderSource::new("blur.hlsl", ShaderStage::Compute, "ao_main").with_define("WIDTH=32");

        assert_eq!(h.output_file_name(), "blur.main.cs_6_6.spv");
        assert_eq!(v.output_file_name(), "blur.main.cs_6_6.V.spv");
        assert_eq!(ao.output_file_name(), "blur.ao_main.cs_6_6.WIDTH-32.spv");
    }

    #[test]
    fn missing_source_is_io_failure() {
        let compiler = DxcCompiler::new("dxc");
        let source = ShaderSource::new("does_not_exist.hlsl", ShaderStage::Pixel, "main");
        match compiler.compile(&source) {
            Err(GfxError::FileIOFailure { path, .. }) => assert!(path.ends_with("does_not_exist.hlsl")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn warnings_are_fatal() {
        let file = Path::new("lighting.hlsl");
        assert!(check_compiler_output(file, &output_with(0, "")).is_ok());

        match check_compiler_output(file, &output_with(0, "warning: implicit truncation")) {
            Err(GfxError::ShaderCompileFailure { diagnostics, .. }) => assert!(diagnostics.contains("truncation")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(check_compiler_output(file, &output_with(1, "")).is_err());
    }
}
