//! Long-form help text for the CLI.

pub const ROOT_LONG_ABOUT: &str = "\
snaplist generates a full or incremental file list suitable for driving a
backup scheme.

It walks every DIR, compares what it finds against the snapshot recorded in
FILELIST, and prints three streams on standard output: entries that were
removed since the previous run, entries that were modified, and entries that
are new. FILELIST is then rewritten to describe the current state of the
filesystem (unless it is /dev/null, which is left alone). Directories leading
up to each DIR are included, so the output always names a complete path from
the filesystem root.

No file content is read or copied; downstream tools such as archivers or
rsync-style transports consume the list to move the actual data.

Incremental runs are driven by a timestamp anchor: with -N FILE, an entry
counts as modified when its inode change time is newer than FILE's. FILE is
re-created after a successful run so the next run picks up from there. If
FILE does not exist, everything is considered modified (a full dump). With
-l, entries are instead compared against the metadata recorded in FILELIST.
Without either, every entry present in both snapshots is reported modified.

Report records are rendered through a template (-F) with these placeholders:

    %c   change code: R removed, M modified, A added
    %m   file mode in octal
    %u   numeric owner id
    %g   numeric group id
    %s   size in bytes (zero for non-regular files)
    %p   path (raw bytes)
    %l   symlink target, empty otherwise
    %x   extended attribute names (requires -a)
    %t   inode change time in seconds since the epoch
    %%   a literal percent sign

The default template is \"%c %p\". Each record ends with a newline, or a NUL
byte under -0; -0 applies to FILELIST parsing and rewriting as well.

A directory containing a file named .nobackup is listed but not entered,
unless -n disables marker handling. Diagnostics go to standard error and
never mix with the record stream on standard output. SIGINT aborts the run
cleanly: the report stops early and FILELIST keeps its previous contents.
";
