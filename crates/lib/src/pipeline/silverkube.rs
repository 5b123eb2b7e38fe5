//! Built-in pipeline: the silverkube desktop Kubernetes package.
//!
//! Rootless container runtime pieces and a single-node control plane, each
//! pinned to the revision the package was validated against.

use std::collections::BTreeMap;

use super::types::*;
use crate::manifest::SlotRange;

// 2019-09-02T05:32:23Z
const ROOTLESSKIT_COMMIT: &str = "182be5f88e62f3568b86331356d237910909b24e";
// 2019-08-30T11:19:53Z
const SLIRP4NETNS_COMMIT: &str = "f9503feb2adcd33ad817f954d294f2076de80f45";
// 2019-09-18T18:53:36Z
const RUNC_COMMIT: &str = "7507c64ff675606c5ff96b0dd8889a60c589f14d";
// 2019-09-20T19:14:38Z
const CRIO_COMMIT: &str = "f8d13a9055fa836b9f624142de4a5e2f01d6fb26";
const CRI_TOOLS_RELEASE: &str = "v1.16.1";
const CONMON_RELEASE: &str = "v2.0.1";
// 2019-09-24T20:37:53Z
const KUBERNETES_COMMIT: &str = "948870b5840add1ba4068e3d27d54ea353839992";
const USERNETES_COMMIT: &str = "d58792bd5d4c56c4dda844ea119ee05a6b0d1808";
// 2019-09-18T15:12:43Z
const CNI_PLUGINS_COMMIT: &str = "291ab6cc849c83882cbe5988c483b334ad1aee36";
const ETCD_RELEASE: &str = "v3.4.1";
const BAZEL_RELEASE: &str = "0.29.1";

/// The kubernetes build script requires a semver string.
const KUBE_GIT_VERSION: &str = "v1.17.0-usernetes";

const BUILD_REQUIRES: &[&str] = &[
  "git",
  "curl",
  "rpm-build",
  "make",
  "btrfs-progs-devel",
  "which",
  "runc",
  "autoconf",
  "automake",
  "libtool",
  "libcap-devel",
  "gcc",
  "gcc-c++",
  "containers-common",
  "device-mapper-devel",
  "glib2-devel",
  "glibc-devel",
  "go",
  "gpgme-devel",
  "libassuan-devel",
  "libgpg-error-devel",
  "libseccomp-devel",
  "libselinux-devel",
  "pkgconfig",
];

fn github(repo: &str, revision: &str) -> Option<GitSource> {
  Some(GitSource::new(&format!("https://github.com/{repo}"), revision))
}

fn fixed(paths: &[&str]) -> Outputs {
  Outputs::Fixed {
    paths: paths.iter().map(|p| p.to_string()).collect(),
  }
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
  pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn component(name: &str, source: Option<GitSource>, steps: Vec<RecipeStep>, outputs: Outputs) -> Component {
  Component {
    name: name.to_string(),
    source,
    toolchains: Vec::new(),
    patches: None,
    env: BTreeMap::new(),
    steps,
    outputs,
  }
}

/// The built-in silverkube pipeline.
pub fn silverkube() -> Pipeline {
  let etcd_dist = format!("etcd-{ETCD_RELEASE}-linux-amd64");
  let etcd_tarball = format!("$${{src}}/{etcd_dist}.tar.gz");
  let etcd_binary = format!("$${{src}}/{etcd_dist}/etcd");

  let components = vec![
    Component {
      env: env(&[("CGO_ENABLED", "0")]),
      ..component(
        "rootlesskit",
        github("rootless-containers/rootlesskit", ROOTLESSKIT_COMMIT),
        vec![
          RecipeStep::cmd([
            "go",
            "build",
            "-o",
            "$${bin}/rootlesskit",
            "github.com/rootless-containers/rootlesskit/cmd/rootlesskit",
          ]),
          RecipeStep::cmd([
            "go",
            "build",
            "-o",
            "$${bin}/rootlessctl",
            "github.com/rootless-containers/rootlesskit/cmd/rootlessctl",
          ]),
        ],
        fixed(&["$${bin}/rootlesskit", "$${bin}/rootlessctl"]),
      )
    },
    component(
      "slirp4netns",
      github("rootless-containers/slirp4netns", SLIRP4NETNS_COMMIT),
      vec![
        RecipeStep::cmd(["./autogen.sh"]),
        RecipeStep::cmd(["./configure"]),
        RecipeStep::cmd(["make"]),
        RecipeStep::install("slirp4netns", "$${bin}/slirp4netns"),
      ],
      fixed(&["$${bin}/slirp4netns"]),
    ),
    component(
      "runc",
      github("opencontainers/runc", RUNC_COMMIT),
      vec![
        RecipeStep::cmd(["make", "BUILDTAGS=seccomp selinux"]),
        RecipeStep::install("runc", "$${bin}/runc"),
      ],
      fixed(&["$${bin}/runc"]),
    ),
    component(
      "cri-o",
      github("cri-o/cri-o", CRIO_COMMIT),
      vec![
        RecipeStep::cmd(["make", "bin/crio"]),
        RecipeStep::install("bin/crio", "$${bin}/crio"),
      ],
      fixed(&["$${bin}/crio"]),
    ),
    component(
      "crictl",
      github("kubernetes-sigs/cri-tools", CRI_TOOLS_RELEASE),
      vec![RecipeStep::cmd([
        "go",
        "build",
        "-o",
        "$${bin}/crictl",
        "github.com/kubernetes-sigs/cri-tools/cmd/crictl",
      ])],
      fixed(&["$${bin}/crictl"]),
    ),
    component(
      "conmon",
      github("containers/conmon", CONMON_RELEASE),
      vec![
        RecipeStep::cmd(["make"]),
        RecipeStep::install("bin/conmon", "$${bin}/conmon"),
      ],
      fixed(&["$${bin}/conmon"]),
    ),
    Component {
      toolchains: vec![Toolchain {
        name: "bazel".to_string(),
        path: format!("$${{cache}}/toolchains/bazel-{BAZEL_RELEASE}/bazel"),
        url: format!(
          "https://github.com/bazelbuild/bazel/releases/download/{BAZEL_RELEASE}/bazel-{BAZEL_RELEASE}-linux-x86_64"
        ),
        mode: Mode::default(),
      }],
      patches: Some(PatchSet {
        source: GitSource::new("https://github.com/rootless-containers/usernetes", USERNETES_COMMIT),
        dir: "src/patches/kubernetes".to_string(),
      }),
      env: env(&[("KUBE_GIT_VERSION", KUBE_GIT_VERSION)]),
      ..component(
        "kubernetes",
        github("kubernetes/kubernetes", KUBERNETES_COMMIT),
        vec![
          RecipeStep::cmd(["bazel", "build", "cmd/hyperkube"]),
          RecipeStep::install("bazel-bin/cmd/hyperkube/hyperkube", "$${bin}/hyperkube"),
        ],
        fixed(&["$${bin}/hyperkube"]),
      )
    },
    component(
      "etcd",
      None,
      vec![
        RecipeStep::Download {
          url: format!("https://github.com/etcd-io/etcd/releases/download/{ETCD_RELEASE}/{etcd_dist}.tar.gz"),
          dest: Some(etcd_tarball.clone()),
        },
        RecipeStep::Extract {
          archive: etcd_tarball,
          into: "$${src}".to_string(),
        },
      ],
      Outputs::Fixed {
        paths: vec![etcd_binary],
      },
    ),
    component(
      "cni-plugins",
      github("containernetworking/plugins", CNI_PLUGINS_COMMIT),
      vec![RecipeStep::cmd(["./build_linux.sh"])],
      Outputs::Directory {
        dir: "$${work}/bin".to_string(),
        sentinel: "portmap".to_string(),
        install_subdir: "cni".to_string(),
      },
    ),
  ];

  Pipeline {
    package: PackageMeta {
      name: "silverkube".to_string(),
      version: "0.0.2".to_string(),
      release: "1%{?dist}".to_string(),
      summary: "A kubernetes service for desktop".to_string(),
      license: "ASL".to_string(),
      url: "https://github.com/podenv/silverkube".to_string(),
      description: "A kubernetes service for desktop".to_string(),
      install_root: "usr/libexec/silverkube".to_string(),
      mode: Mode::default(),
      changelog: vec![ChangelogEntry {
        header: "Sat Sep 21 2019 Tristan Cacqueray <tdecacqu@redhat.com>".to_string(),
        lines: vec!["Initial packaging".to_string()],
      }],
    },
    payload: vec![Payload {
      name: "silverkube.py".to_string(),
      source: "silverkube.py".to_string(),
      destination: "bin/silverkube".to_string(),
      mode: Mode::default(),
    }],
    bootstrap: Some(Bootstrap {
      command: vec!["dnf".to_string(), "install".to_string(), "-y".to_string()],
      packages: BUILD_REQUIRES.iter().map(|p| p.to_string()).collect(),
    }),
    env: env(&[("GOPATH", "$${cache}"), ("GO111MODULE", "off")]),
    components,
    packaging: PackagingTool::default(),
    slots: SlotRange::default(),
  }
}
