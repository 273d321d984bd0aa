//! 被包装对象的持有方式：借用或拥有。
//!
//! # 设计背景（Why）
//! - 装饰器既可能包装调用方仍需继续使用的流（借用，装饰器不得关闭它），
//!   也可能包装专门为其构造的流（拥有，装饰器关闭时一并关闭）；
//! - 将持有方式抽象为 trait，装饰器只需一份实现即可覆盖两种场景。
//!
//! # 契约说明（What）
//! - [`Dependency::is_owning`] 为 `true` 时，装饰器负责关闭被包装对象并接收其失败；
//! - 同一被包装对象只由一个拥有者关闭一次。

use alloc::boxed::Box;
use core::ops::{Deref, DerefMut};

/// 被包装对象的持有者。
pub trait Dependency {
    /// 被包装对象的类型。
    type Target: ?Sized;

    /// 共享访问。
    fn get(&self) -> &Self::Target;

    /// 独占访问。
    fn get_mut(&mut self) -> &mut Self::Target;

    /// 是否拥有被包装对象。
    fn is_owning(&self) -> bool;
}

impl<T: ?Sized> Dependency for &mut T {
    type Target = T;

    fn get(&self) -> &T {
        self
    }

    fn get_mut(&mut self) -> &mut T {
        self
    }

    fn is_owning(&self) -> bool {
        false
    }
}

impl<T: ?Sized> Dependency for Box<T> {
    type Target = T;

    fn get(&self) -> &T {
        self
    }

    fn get_mut(&mut self) -> &mut T {
        self
    }

    fn is_owning(&self) -> bool {
        true
    }
}

/// 按值拥有被包装对象。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owned<T>(pub T);

impl<T> Owned<T> {
    /// 取回被包装对象。
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Owned<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Owned<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> Dependency for Owned<T> {
    type Target = T;

    fn get(&self) -> &T {
        &self.0
    }

    fn get_mut(&mut self) -> &mut T {
        &mut self.0
    }

    fn is_owning(&self) -> bool {
        true
    }
}

/// 运行期决定借用还是拥有。
#[derive(Debug)]
pub enum MaybeOwned<'a, T: ?Sized> {
    /// 借用，不负责关闭。
    Borrowed(&'a mut T),
    /// 拥有，关闭时一并关闭。
    Owned(Box<T>),
}

impl<T: ?Sized> Dependency for MaybeOwned<'_, T> {
    type Target = T;

    fn get(&self) -> &T {
        match self {
            MaybeOwned::Borrowed(target) => target,
            MaybeOwned::Owned(target) => target,
        }
    }

    fn get_mut(&mut self) -> &mut T {
        match self {
            MaybeOwned::Borrowed(target) => target,
            MaybeOwned::Owned(target) => target,
        }
    }

    fn is_owning(&self) -> bool {
        matches!(self, MaybeOwned::Owned(_))
    }
}
