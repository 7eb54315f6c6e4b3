//! Known-exploitable type names
//!
//! Fragments of type identities that are known deserialization gadgets. A
//! candidate whose identity contains any fragment can never be allow-listed.
//! The table is compiled in; updating it requires a new build.

/// Gadget type-name fragments, matched as case-sensitive substrings.
pub const EXPLOITABLE_TYPE_FRAGMENTS: &[&str] = &[
    "System.Security.Principal.WindowsIdentity",
    "System.Security.Principal.WindowsPrincipal",
    "System.Security.Claims.ClaimsIdentity",
    "System.Security.Claims.ClaimsPrincipal",
    "Microsoft.IdentityModel.Claims.WindowsClaimsIdentity",
    "System.Web.Security.RolePrincipal",
    "System.IdentityModel.Tokens.SessionSecurityToken",
    "System.Windows.Data.ObjectDataProvider",
    "System.Windows.ResourceDictionary",
    "System.Windows.Markup.XamlReader",
    "System.Windows.Forms.AxHost+State",
    "System.Data.Services.Internal.ExpandedWrapper",
    "System.Data.DataSet",
    "System.Configuration.Install.AssemblyInstaller",
    "System.Management.Automation.PSObject",
    "Microsoft.VisualStudio.Text.Formatting.TextFormattingRunProperties",
    "System.Workflow.ComponentModel.Serialization.ActivitySurrogateSelector",
    "System.Resources.ResourceSet",
    "System.Runtime.Remoting.ObjRef",
    "System.DelegateSerializationHolder",
    "System.CodeDom.Compiler.TempFileCollection",
    "System.Diagnostics.Process",
    "System.IO.FileSystemInfo",
];

/// Read-only view over [`EXPLOITABLE_TYPE_FRAGMENTS`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExploitableTypeRegistry;

impl ExploitableTypeRegistry {
    pub fn fragments() -> &'static [&'static str] {
        EXPLOITABLE_TYPE_FRAGMENTS
    }

    /// The first fragment contained in `identity`, if any
    pub fn find_match(identity: &str) -> Option<&'static str> {
        EXPLOITABLE_TYPE_FRAGMENTS
            .iter()
            .copied()
            .find(|fragment| identity.contains(fragment))
    }

    pub fn is_exploitable(identity: &str) -> bool {
        Self::find_match(identity).is_some()
    }
}
