// XSL Runner
// Applies an XSL stylesheet to an XML document through xsltproc

use super::{require_tool, resolve_source, run_process, write_temp_file, TaskError, TaskOutput};
use crate::tasks::XslTransformTask;
use crate::template::{render, TemplateContext};

use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const XSLTPROC: &str = "xsltproc";

pub struct XslRunner {
    working_dir: PathBuf,
}

impl XslRunner {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    /// Render stylesheet and document, transform them; the output is the transformation result
    pub async fn run(
        &self,
        task: &XslTransformTask,
        context: &TemplateContext<'_>,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, TaskError> {
        require_tool(XSLTPROC)?;

        let xsl = resolve_source(&task.xsl, &[], &self.working_dir).await?;
        let xml = resolve_source(&task.xml, &[], &self.working_dir).await?;
        let xsl_path = write_temp_file("hyperion-xsl-", "xsl", &render(&xsl, context)?).await?;
        let xml_path = write_temp_file("hyperion-xml-", "xml", &render(&xml, context)?).await?;

        let args = [xsl_path.as_os_str(), xml_path.as_os_str()];
        let output = run_process(XSLTPROC, args, &self.working_dir, cancel).await?;
        if !output.success() {
            tracing::warn!("xsl transform failed: {}", output.stderr);
        }
        Ok(output.into())
    }
}
