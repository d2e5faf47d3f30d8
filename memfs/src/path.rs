use alloc::string::String;
use alloc::vec::Vec;

pub trait Path {
    fn is_absolute(&self) -> bool;

    /// 返回以`/`开头、不以`/`结束(根目录除外)、不包含相对项的绝对路径。
    ///
    /// 只做字符串上的规范化，不检查路径是否存在；`..`在根目录处不起作用。
    ///
    /// # 参数
    ///
    /// `cwd`: 相对路径所相对的目录，为绝对路径。
    fn normalize(&self, cwd: &str) -> String;

    /// 返回规范化路径的`(父目录, 文件名)`，根目录返回`None`
    fn parent_file(&self) -> Option<(&str, &str)>;

    /// 规范化路径是否位于目录`dir`之下(不含`dir`本身)
    fn is_within(&self, dir: &str) -> bool;

    fn is_relative(&self) -> bool {
        !self.is_absolute()
    }
}

impl Path for str {
    fn is_absolute(&self) -> bool {
        self.starts_with('/')
    }

    fn normalize(&self, cwd: &str) -> String {
        let mut cmps = Vec::new();
        let relative_cmps = self.is_relative().then(|| cwd.split('/')).into_iter();

        for cmp in relative_cmps.flatten().chain(self.split('/')) {
            match cmp {
                ".." => {
                    cmps.pop();
                }
                "." | "" => (),
                s => cmps.push(s),
            }
        }

        let mut path = String::with_capacity(self.len() + 1);
        for cmp in &cmps {
            path.push('/');
            path.push_str(cmp);
        }
        if path.is_empty() {
            path.push('/');
        }

        path
    }

    fn parent_file(&self) -> Option<(&str, &str)> {
        if self == "/" {
            return None;
        }

        self.rsplit_once('/')
            .map(|(p, f)| if p.is_empty() { ("/", f) } else { (p, f) })
    }

    fn is_within(&self, dir: &str) -> bool {
        if dir == "/" {
            return self != "/";
        }

        self.strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::Path;

    #[test]
    fn normalize() {
        assert_eq!("/".normalize("/"), "/");
        assert_eq!("".normalize("/"), "/");
        assert_eq!("/a/b/../c/./d".normalize("/"), "/a/c/d");
        assert_eq!("//a///b/".normalize("/"), "/a/b");
        assert_eq!("../../..".normalize("/x"), "/");
        assert_eq!("f".normalize("/d"), "/d/f");
        assert_eq!("./f".normalize("/d/e"), "/d/e/f");
        assert_eq!("../f".normalize("/d/e"), "/d/f");
        assert_eq!("/abs".normalize("/d/e"), "/abs");
    }

    #[test]
    fn parent_file() {
        assert_eq!("/".parent_file(), None);
        assert_eq!("/a".parent_file(), Some(("/", "a")));
        assert_eq!("/a/b/c".parent_file(), Some(("/a/b", "c")));
    }

    #[test]
    fn is_within() {
        assert!("/d/f".is_within("/d"));
        assert!("/d/e/f".is_within("/d"));
        assert!(!"/d".is_within("/d"));
        assert!(!"/dd/f".is_within("/d"));
        assert!("/d".is_within("/"));
        assert!(!"/".is_within("/"));
    }
}
