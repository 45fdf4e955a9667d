use std::path::Path;

use anyhow::Context;
use futures::future::try_join_all;

use crate::{
    link::Technique,
    resources::{
        ledger::{ResourceKind, ResourceLedger, TrackedMap},
        load_string,
    },
};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Compiled vertex and fragment modules of one technique.
pub struct ShaderProgram {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

pub fn shader_paths(technique: Technique) -> [String; 2] {
    let file = technique.shader_file();
    [format!("shaders/{file}.vert"), format!("shaders/{file}.frag")]
}

/// Error messages from a compiled module, if any.
async fn compile_errors(module: &wgpu::ShaderModule) -> Vec<String> {
    module
        .get_compilation_info()
        .await
        .messages
        .into_iter()
        .filter(|message| message.message_type == wgpu::CompilationMessageType::Error)
        .map(|message| match message.location {
            Some(location) => format!(
                "{}:{}: {}",
                location.line_number, location.line_position, message.message
            ),
            None => message.message,
        })
        .collect()
}

async fn compile(device: &wgpu::Device, path: &str, source: String) -> anyhow::Result<wgpu::ShaderModule> {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(path),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let errors = compile_errors(&module).await;
    anyhow::ensure!(
        errors.is_empty(),
        "{path} failed to compile:\n{}",
        errors.join("\n")
    );
    Ok(module)
}

/// One program per technique, loaded from `shaders/<file>.vert` and `.frag`.
pub struct ShaderStore {
    programs: TrackedMap<ShaderProgram>,
}

impl ShaderStore {
    pub async fn load(
        device: &wgpu::Device,
        root: &Path,
        techniques: &[Technique],
        ledger: &mut ResourceLedger,
    ) -> anyhow::Result<Self> {
        let sources = try_join_all(techniques.iter().map(|&technique| async move {
            let [vert, frag] = shader_paths(technique);
            let (vert_src, frag_src) =
                futures::try_join!(load_string(root, &vert), load_string(root, &frag))?;
            anyhow::Ok((technique, [(vert, vert_src), (frag, frag_src)]))
        }))
        .await?;

        let mut programs = TrackedMap::new(ResourceKind::ShaderModule);
        for (technique, [(vert, vert_src), (frag, frag_src)]) in sources {
            let program = ShaderProgram {
                vertex: compile(device, &vert, vert_src).await?,
                fragment: compile(device, &frag, frag_src).await?,
            };
            log::debug!("compiled {technique:?} from {vert} and {frag}");
            programs.insert(ledger, technique.shader_file(), program)?;
        }
        log::info!("compiled {} shader programs", programs.len());
        Ok(Self { programs })
    }

    pub fn get(&self, technique: Technique) -> anyhow::Result<&ShaderProgram> {
        self.programs
            .get(technique.shader_file())
            .with_context(|| format!("no shader program loaded for {technique:?}"))
    }

    /// Modules have no explicit destroy; dropping them is the release.
    pub fn release(&mut self, ledger: &mut ResourceLedger) -> anyhow::Result<()> {
        self.programs.release_all(ledger, |_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_technique_reads_shadow_map_pair() {
        assert_eq!(
            shader_paths(Technique::Shadow),
            ["shaders/shadow_map.vert", "shaders/shadow_map.frag"]
        );
    }

    #[tokio::test]
    async fn missing_shader_source_names_the_file() {
        let err = load_string(Path::new("/nonexistent"), &shader_paths(Technique::Water)[0])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("water.vert"));
    }
}
